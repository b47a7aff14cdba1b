/// A guard that runs a teardown closure when dropped.
///
/// Teardown registered this way also runs when the scope unwinds from a
/// panic, so a session that dies half-way still reclaims the terminal,
/// kills its tracked processes and removes temporary workspaces.
///
/// # Examples
///
/// ```
/// use ocenv::utils::guard::ExitGuard;
///
/// let _guard = ExitGuard::with(|| {
///     println!("teardown");
/// });
///
/// // "teardown" is printed when _guard goes out of scope
/// ```
pub struct ExitGuard<F: FnOnce()> {
    exit_cb: Option<F>,
}

impl<F: FnOnce()> ExitGuard<F> {
    /// Creates a guard that calls `f` on drop.
    pub fn with(f: F) -> Self {
        Self { exit_cb: Some(f) }
    }
}

impl<F: FnOnce()> Drop for ExitGuard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.exit_cb.take() {
            f()
        }
    }
}
