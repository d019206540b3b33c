pub mod auth;
pub mod binary;
pub mod coldef;
pub mod command;
pub mod connection;
pub mod handshake;
pub mod packet;
pub mod primitive;
pub mod response;
pub mod text;
