pub mod navigation;
pub mod policy;

pub use navigation::{initial_route, Route, TabNavigator};
pub use policy::{
    allowed_screens, fallback_screen, is_allowed, product_scope, select_screen, select_tab,
    ProductScope, Screen,
};
