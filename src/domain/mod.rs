pub mod enemy;
pub mod entity;
pub mod geom;
pub mod loot;
pub mod room;
