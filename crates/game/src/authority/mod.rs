mod request;
mod role;

pub use request::{
    AcceptAll, ActionRequest, ArchivedActionRequest, CadenceValidator, RequestContext,
    RequestValidator,
};
pub use role::{ParticipantId, Role};
