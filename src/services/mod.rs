pub mod auto_download;
