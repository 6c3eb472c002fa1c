// Yes/no confirmation used by the CLI menus.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmState {
    Idle,
    Pending,
    Committed,
    Cancelled,
}

/// idle → pending → committed | cancelled. Invalid answers keep the flow
/// pending; a settled flow ignores further answers until [`reset`].
///
/// [`reset`]: ConfirmFlow::reset
#[derive(Debug, Clone)]
pub struct ConfirmFlow {
    prompt: String,
    state: ConfirmState,
}

impl ConfirmFlow {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            state: ConfirmState::Idle,
        }
    }

    pub fn state(&self) -> ConfirmState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, ConfirmState::Committed | ConfirmState::Cancelled)
    }

    /// Move to pending and return the prompt to show.
    pub fn request(&mut self) -> &str {
        if self.state == ConfirmState::Idle {
            self.state = ConfirmState::Pending;
        }
        &self.prompt
    }

    pub fn answer(&mut self, input: &str) -> ConfirmState {
        if self.state != ConfirmState::Pending {
            return self.state;
        }
        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => self.state = ConfirmState::Committed,
            "N" | "NO" => self.state = ConfirmState::Cancelled,
            _ => {}
        }
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ConfirmState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_before_request_are_ignored() {
        let mut flow = ConfirmFlow::new("Continue? (Y/N): ");
        assert_eq!(flow.answer("y"), ConfirmState::Idle);
    }

    #[test]
    fn invalid_answer_stays_pending() {
        let mut flow = ConfirmFlow::new("Continue? (Y/N): ");
        assert_eq!(flow.request(), "Continue? (Y/N): ");
        assert_eq!(flow.answer("maybe"), ConfirmState::Pending);
        assert_eq!(flow.answer(" n "), ConfirmState::Cancelled);
        assert!(flow.is_settled());
    }

    #[test]
    fn settled_flow_needs_reset() {
        let mut flow = ConfirmFlow::new("?");
        flow.request();
        assert_eq!(flow.answer("Y"), ConfirmState::Committed);
        assert_eq!(flow.answer("N"), ConfirmState::Committed);
        flow.reset();
        flow.request();
        assert_eq!(flow.answer("no"), ConfirmState::Cancelled);
    }
}
