pub mod abnormal;
pub mod buff_info;
pub mod creature;
pub mod npc;
pub mod options;
pub mod skills;
