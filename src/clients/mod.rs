pub mod nyaa;
pub mod qbittorrent;
pub mod shoko;
