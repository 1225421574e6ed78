//! Per-aggregate repositories.
//!
//! Subjects, topics, and tests are the generic [`Repository`](crate::repository::Repository)
//! specialized with extra read paths. Questions wrap two generic repositories
//! so a question and its options are always written together.

pub mod question;
pub mod subject;
pub mod topic;

pub use question::QuestionRepository;
pub use subject::SubjectRepository;
pub use test::TestRepository;
pub use topic::TopicRepository;
