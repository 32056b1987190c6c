pub mod conditions;
pub mod effect_list;
