//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and the store/directory seams so route
//! handlers can stay focused on protocol translation and caller identity.
//! Services that mutate elements broadcast the result to the board room
//! themselves, since both transports call them.

pub mod access;
pub mod batch;
pub mod board;
pub mod cursor;
pub mod element;
pub mod lock;
pub mod store;
