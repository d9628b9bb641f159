pub mod implant;
pub mod percept;
pub mod registry;
pub mod retinotopy;
pub mod scoreboard;
pub mod stimulus;
pub mod temp_file;
