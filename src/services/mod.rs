pub mod citizen_service;
pub mod describe_service;
pub mod upload_service;
pub mod user_service;

pub use citizen_service::CitizenService;
pub use describe_service::{DescribeError, DescribeService};
pub use upload_service::{FileView, UploadError, UploadService};
pub use user_service::UserService;
