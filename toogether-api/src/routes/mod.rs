pub mod auth;
pub mod blocks;
pub mod groups;
pub mod health;
pub mod matches;
pub mod profile;
pub mod queue;
pub mod recovery;
pub mod swipes;
