/// A coordinator-local callback taking no arguments. Run once per phase
/// (never per-mapping) around the deactivation/activation passes.
///
/// A failing hook is logged and does not abort the phase it's attached to —
/// hooks are diagnostic, not part of the transition's success condition.
pub type Hook = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

pub fn noop_hook() -> Hook {
  Box::new(|| Ok(()))
}

pub fn run_hook(name: &str, hook: &Hook) {
  if let Err(e) = hook() {
    tracing::warn!(hook = name, error = %e, "hook failed, continuing");
  }
}
