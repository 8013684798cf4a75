use std::fs;
use std::process;

use guestbook::config::Config;
use guestbook::database::PostStore;
use iron::Iron;
use log::{error, info, warn};

// RUST_LOG=info guestbook
fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::create_dir_all(&config.data_path) {
        warn!("could not create data directory {}: {}", config.data_path.display(), e);
    }

    let store = PostStore::open(&config.data_path);
    info!("storing posts in {}", store.path().display());

    let address = config.address();
    match Iron::new(guestbook::chain(store)).http(address.as_str()) {
        Ok(_listening) => info!("listening on {}", address),
        Err(e) => {
            error!("failed to bind {}: {}", address, e);
            process::exit(1);
        }
    }
}
