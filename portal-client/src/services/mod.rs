pub mod auth_api;
pub mod records;
mod wire;

pub use auth_api::{
    AuthApi, Credentials, HttpAuthApi, LoginSuccess, LogoutAck, TokenValidation,
};
pub use records::RecordsClient;
