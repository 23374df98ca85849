mod blocking;
mod streaming;
