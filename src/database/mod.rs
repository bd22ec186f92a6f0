// Dual storage: LanceDB holds every bot's chunk vectors in one shared
// collection; SQLite holds the OTP verification store and the upload log.

pub mod lancedb;
pub mod sqlite;
