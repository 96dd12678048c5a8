/// Raised by a command that needs a cached login when none exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unable to retrieve the last login for {backend}. Please login to {backend} using: hpecli {command} login"
)]
pub struct LoginRequired {
    /// Display name of the backend, e.g. "OneView".
    pub backend: &'static str,
    /// CLI subcommand of the backend, e.g. "oneview".
    pub command: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_login_command() {
        let err = LoginRequired {
            backend: "HPE iLO",
            command: "ilo",
        };
        assert_eq!(
            err.to_string(),
            "unable to retrieve the last login for HPE iLO. Please login to HPE iLO using: hpecli ilo login"
        );
    }
}
