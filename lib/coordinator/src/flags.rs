/// The flag bitset from §6, rendered as named booleans rather than a packed
/// integer — there's no packed-flags idiom elsewhere in this codebase to
/// match, and `clap`'s derive maps each field onto its own `--flag` directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployFlags {
  /// Skip the lock/unlock phases entirely.
  pub no_lock: bool,
  /// Skip the migrate phase.
  pub no_migration: bool,
  /// Treat the old manifest as empty: full activation, no diff.
  pub no_upgrade: bool,
  /// After a successful deploy, request removal of old profile generations.
  pub delete_old: bool,
}
