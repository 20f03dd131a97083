use rkyv::{Archive, Deserialize, Serialize};

use super::ParticipantId;

/// Action an observer asks the host to execute on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ActionRequest {
    PullTrigger { weapon_id: u32 },
    BeginReload { weapon_id: u32 },
}

impl ActionRequest {
    pub fn weapon_id(&self) -> u32 {
        match self {
            Self::PullTrigger { weapon_id } | Self::BeginReload { weapon_id } => *weapon_id,
        }
    }
}

/// What the host knows about the target weapon when a request arrives.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub from: ParticipantId,
    pub weapon_owner: Option<ParticipantId>,
    pub now: f64,
    pub last_fire: Option<f64>,
    pub min_interval: f64,
}

pub trait RequestValidator {
    fn validate(&self, request: &ActionRequest, ctx: &RequestContext) -> bool;
}

/// Executes every request as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RequestValidator for AcceptAll {
    fn validate(&self, _request: &ActionRequest, _ctx: &RequestContext) -> bool {
        true
    }
}

/// Rejects requests for weapons the sender does not own and trigger pulls
/// arriving faster than the weapon cadence allows.
#[derive(Debug, Clone, Copy)]
pub struct CadenceValidator {
    pub tolerance: f64,
}

impl Default for CadenceValidator {
    fn default() -> Self {
        Self { tolerance: 0.02 }
    }
}

impl RequestValidator for CadenceValidator {
    fn validate(&self, request: &ActionRequest, ctx: &RequestContext) -> bool {
        if ctx.weapon_owner != Some(ctx.from) {
            return false;
        }

        match request {
            ActionRequest::PullTrigger { .. } => match ctx.last_fire {
                Some(last) => ctx.now - last >= ctx.min_interval - self.tolerance,
                None => true,
            },
            ActionRequest::BeginReload { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(from: u32, last_fire: Option<f64>, now: f64) -> RequestContext {
        RequestContext {
            from: ParticipantId(from),
            weapon_owner: Some(ParticipantId(1)),
            now,
            last_fire,
            min_interval: 0.1,
        }
    }

    #[test]
    fn accept_all_ignores_context() {
        let request = ActionRequest::PullTrigger { weapon_id: 9 };
        assert!(AcceptAll.validate(&request, &context(7, Some(1.0), 1.0)));
    }

    #[test]
    fn cadence_rejects_foreign_weapon() {
        let request = ActionRequest::BeginReload { weapon_id: 9 };
        let validator = CadenceValidator::default();
        assert!(!validator.validate(&request, &context(2, None, 0.0)));
        assert!(validator.validate(&request, &context(1, None, 0.0)));
    }

    #[test]
    fn cadence_rejects_rapid_pulls() {
        let request = ActionRequest::PullTrigger { weapon_id: 9 };
        let validator = CadenceValidator::default();
        assert!(!validator.validate(&request, &context(1, Some(1.0), 1.05)));
        assert!(validator.validate(&request, &context(1, Some(1.0), 1.09)));
        assert!(validator.validate(&request, &context(1, Some(1.0), 1.2)));
    }
}
