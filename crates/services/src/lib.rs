#![forbid(unsafe_code)]

pub mod app_services;
pub mod enrollment_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;
pub mod rollup;
pub mod stats_service;

pub use record_core::Clock;

pub use app_services::AppServices;
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, EnrollmentServiceError, ErrorKind, ProgressServiceError, QuizServiceError,
    StatsServiceError,
};
pub use progress_service::ProgressService;
pub use quiz_service::QuizService;
pub use rollup::CourseRollup;
pub use stats_service::StatsService;
