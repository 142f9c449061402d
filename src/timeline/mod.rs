// Timeline translation layer
// Records + roles -> detected roles -> tasks -> dependency order -> groups -> renderer,
// and timeline events back into record field updates.

pub mod detect;
pub mod edit;
pub mod groups;
pub mod links;
pub mod mapper;
pub mod render;
pub mod sort;
pub mod view;

pub use detect::{ResolvedRoles, RoleCache};
pub use edit::{EditError, FieldUpdate, FieldWrite, TimelineEvent};
pub use render::{JsonRenderer, MountedRenderer, TextRenderer, TimelineRenderer};
pub use view::{EventOutcome, TimelineOutcome, TimelineView};
