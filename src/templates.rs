pub const CHRONOGRAF_SERVICE: &str = include_str!("../templates/chronograf.service");
pub const INIT_SH: &str = include_str!("../templates/init.sh");
