//! Core of the now-playing bridge: data model, collaborator traits, session
//! resolution and the command REPL. Platform backends live in
//! `quickmedia-media-session`.

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod resolver;
pub mod response;
pub mod testing;
pub mod traits;

pub use command::*;
pub use dispatcher::*;
pub use error::*;
pub use models::*;
pub use resolver::*;
pub use response::*;
pub use traits::*;
