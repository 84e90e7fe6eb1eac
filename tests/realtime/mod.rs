mod calls;
mod handshake;
mod isolation;
mod messages;
mod presence;
