pub mod envfile;
pub mod numeric;
