mod api_keys;
mod categories;
mod category_form;
mod dashboard;
mod login;
mod order_detail;
mod orders;
mod product_detail;
mod product_form;
mod products;
mod users;

pub use api_keys::ApiKeysView;
pub use categories::CategoriesView;
pub use category_form::CategoryFormView;
pub use dashboard::DashboardView;
pub use login::LoginView;
pub use order_detail::OrderDetailView;
pub use orders::OrdersView;
pub use product_detail::ProductDetailView;
pub use product_form::ProductFormView;
pub use products::ProductsView;
pub use users::UsersView;
