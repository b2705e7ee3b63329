//! tubetui core - playback and queue controller
//!
//! This crate supervises the external player process, talks to it over its
//! control socket, tracks progress, and decides what plays next. It also
//! carries the search, thumbnail, paging and snapshot collaborators used by
//! the terminal front end.

pub mod advance;
pub mod command;
pub mod config;
pub mod controller;
pub mod details;
pub mod ipc;
pub mod pagination;
pub mod poller;
pub mod queue;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod supervisor;
pub mod thumbnail;
pub mod track;

pub use advance::Boundary;
pub use command::{ Command, CommandError };
pub use config::PlayerConfig;
pub use controller::{ Advance, Controller, Notice, PlaybackError, PlayerEvent };
pub use details::{ DetailLoader, Loaded };
pub use ipc::{ IpcError, Transport };
pub use pagination::Page;
pub use queue::{ ModeLabel, PlaybackMode, Queue };
pub use search::{ QueryKind, SearchError, Searcher, VersionStatus };
pub use session::{ PlayMode, PlaybackState, SessionInfo };
pub use snapshot::{ Snapshot, SnapshotError };
pub use supervisor::{ Invocation, Launcher, MpvLauncher };
pub use thumbnail::{ ThumbnailCache, ThumbnailError };
pub use track::Track;
