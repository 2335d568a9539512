use clap::Parser;

/// Runs a scripted drawing-game session inside one process: a host creates
/// a room, guests join it, the host starts the game and shares one stroke.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Display name of the hosting player.
    #[arg(long, default_value = "ada")]
    pub host: String,

    /// Display names of the guests joining the room, in join order.
    #[arg(long, value_delimiter = ',', default_value = "grace,alan")]
    pub guests: Vec<String>,
}
