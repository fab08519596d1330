pub mod descriptor;
pub mod labels;
pub mod service;

pub use labels::{find_branch_name_by_label_name, LABEL_STATUS_BACKPORTED, LABEL_TYPE_BACKPORT};
pub use service::{backport_body, BackportService};
