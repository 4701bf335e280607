//! Check evaluator - turns one catalog check into a verdict.
//!
//! Fail-closed: a probe error or an unknown type name is always a
//! failing verdict, for direct and negated checks alike.

use std::sync::Arc;
use tracing::{debug, warn};

use phocus_common::Check;

use crate::probe::{ProbeResult, Probes};
use crate::registry::{CheckArgs, CheckType, Polarity};

/// Coerce a probe answer into a verdict
pub fn verdict(polarity: Polarity, result: ProbeResult) -> bool {
    match result {
        Ok(matched) => polarity.apply(matched),
        Err(_) => false,
    }
}

/// Evaluates checks against a probe set
#[derive(Clone)]
pub struct Evaluator {
    probes: Arc<dyn Probes>,
}

impl Evaluator {
    pub fn new(probes: Arc<dyn Probes>) -> Self {
        Self { probes }
    }

    /// Evaluate one check.
    ///
    /// Fills `check.message` with the type's default when it is empty;
    /// a message that is already set is left alone.
    pub async fn evaluate(&self, check: &mut Check) -> bool {
        let check_type = match check.check_type.parse::<CheckType>() {
            Ok(check_type) => check_type,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };

        if check.message.is_empty() {
            let message = check_type.default_message(CheckArgs::from(&*check));
            check.message = message;
        }

        let result = check_type
            .probe(self.probes.as_ref(), CheckArgs::from(&*check))
            .await;
        if let Err(e) = &result {
            debug!("{} could not be determined: {}", check_type, e);
        }

        verdict(check_type.polarity, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FakeProbes, ProbeError};

    fn evaluator(probes: FakeProbes) -> Evaluator {
        Evaluator::new(Arc::new(probes))
    }

    #[test]
    fn test_verdict_coercion() {
        assert!(verdict(Polarity::Direct, Ok(true)));
        assert!(verdict(Polarity::Negated, Ok(false)));
        assert!(!verdict(
            Polarity::Direct,
            Err(ProbeError::Unavailable("x".to_string()))
        ));
        assert!(!verdict(
            Polarity::Negated,
            Err(ProbeError::Unavailable("x".to_string()))
        ));
    }

    #[tokio::test]
    async fn test_fills_default_message_once() {
        let eval = evaluator(FakeProbes::builder().answer("service_active", true).build());
        let mut check = Check::new("ServiceUp", ["ssh", "", ""], 5);

        assert!(eval.evaluate(&mut check).await);
        assert_eq!(check.message, "Service ssh is running");

        // Changing arguments later does not rewrite the filled message
        check.arg1 = "nginx".to_string();
        eval.evaluate(&mut check).await;
        assert_eq!(check.message, "Service ssh is running");
    }

    #[tokio::test]
    async fn test_custom_message_is_kept() {
        let eval = evaluator(FakeProbes::all_answering(true));
        let mut check =
            Check::new("FirewallUp", ["", "", ""], 5).with_message("ufw turned on");

        assert!(eval.evaluate(&mut check).await);
        assert_eq!(check.message, "ufw turned on");
    }

    #[tokio::test]
    async fn test_unknown_type_fails_without_probing() {
        let probes = Arc::new(FakeProbes::all_answering(true));
        let eval = Evaluator::new(probes.clone());
        let mut check = Check::new("RegistryKeyExists", ["HKLM", "", ""], 5);

        assert!(!eval.evaluate(&mut check).await);
        assert!(check.message.is_empty());
        assert_eq!(probes.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_arguments_reach_probe() {
        let probes = Arc::new(FakeProbes::all_answering(true));
        let eval = Evaluator::new(probes.clone());
        let mut check = Check::new("PermissionIsNot", ["/etc/shadow", "octal", "777"], 5);

        assert!(!eval.evaluate(&mut check).await);
        assert_eq!(
            probes.last_args("permission_matches"),
            Some(vec![
                "/etc/shadow".to_string(),
                "octal".to_string(),
                "777".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_password_changed_inverts_probe() {
        let eval = evaluator(
            FakeProbes::builder()
                .answer("password_unchanged_from_hash", true)
                .build(),
        );
        let mut changed = Check::new("PasswordChanged", ["alice", "$6$old", ""], 5);
        let mut not_changed = Check::new("PasswordChangedNot", ["alice", "$6$old", ""], 5);

        assert!(!eval.evaluate(&mut changed).await);
        assert!(eval.evaluate(&mut not_changed).await);
    }
}
