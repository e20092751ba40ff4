pub mod bands;
pub mod calc_bad_nights;
pub mod init_db;
pub mod list_bad_nights;
pub mod list_nights;
pub mod star_info;

pub use bands::show_bands;
pub use calc_bad_nights::calc_bad_nights_command;
pub use init_db::init_db;
pub use list_bad_nights::list_bad_nights;
pub use list_nights::list_nights;
pub use star_info::show_star;
