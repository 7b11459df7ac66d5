// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Gender, UserStatus, MatchStatus, User, UserPublic, Match, Message, QueueStatus};
pub use requests::{RegisterRequest, VerifyOtpRequest, ProfileSetupRequest, MessageRequest};
pub use responses::{RegisterResponse, TokenResponse, MatchList, ChatHistory, ErrorResponse};
