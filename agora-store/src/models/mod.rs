//! Domain models with validation at construction
//!
//! User input is validated when creating the newtypes here.
//! Invalid input returns ValidationError, not panic.

pub mod community;
pub mod pagination;
pub mod search;
pub mod thread;
pub mod tree;
pub mod user;
pub mod validation;

pub use community::{
    Community, CommunityDetails, CommunityPosts, CommunityWithMembers, MembershipRow,
};
pub use pagination::{Paginated, Pagination, SortOrder, DEFAULT_PER_PAGE, DEFAULT_THREADS_PER_PAGE};
pub use search::SearchTerm;
pub use thread::{
    ActivityItem, ProfileThreads, ReplyNode, Thread, ThreadDetail, ThreadText, ThreadWithReplies,
    DETAIL_REPLY_DEPTH, LIST_REPLY_DEPTH,
};
pub use tree::ReplyForest;
pub use user::{AuthorSummary, MemberSummary, User, UserSummary, Username};
pub use validation::ValidationError;
