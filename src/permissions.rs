//! Feature flags for standard users and screen access rules.
//!
//! Administrators see every screen. Standard users see a management screen
//! only when its flag is on. The flags are stored as one JSON document in
//! `local_settings` (category "permissions", key "app").

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::User;
use crate::db::{self, DbState};
use crate::error::{AppError, AppResult};

const PERMISSIONS_CATEGORY: &str = "permissions";
const PERMISSIONS_KEY: &str = "app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPermissions {
    pub show_database_designer: bool,
    #[serde(rename = "showAIAssistant")]
    pub show_ai_assistant: bool,
    pub show_analytics: bool,
    pub show_sales_form: bool,
    pub show_sellers_manager: bool,
    pub show_customers_manager: bool,
    pub show_services_manager: bool,
}

impl Default for AppPermissions {
    fn default() -> Self {
        Self {
            show_database_designer: true,
            show_ai_assistant: true,
            show_analytics: false,
            show_sales_form: true,
            show_sellers_manager: true,
            show_customers_manager: true,
            show_services_manager: true,
        }
    }
}

impl AppPermissions {
    /// Flip one flag by its camelCase name.
    pub fn toggle(&mut self, key: &str) -> AppResult<bool> {
        let flag = match key.trim() {
            "showDatabaseDesigner" => &mut self.show_database_designer,
            "showAIAssistant" => &mut self.show_ai_assistant,
            "showAnalytics" => &mut self.show_analytics,
            "showSalesForm" => &mut self.show_sales_form,
            "showSellersManager" => &mut self.show_sellers_manager,
            "showCustomersManager" => &mut self.show_customers_manager,
            "showServicesManager" => &mut self.show_services_manager,
            other => return Err(AppError::Invalid(format!("Permiso desconocido: {other}"))),
        };
        *flag = !*flag;
        Ok(*flag)
    }
}

/// The screens of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Database,
    UsersList,
    Permissions,
    SalesForm,
    SellersManager,
    CustomersManager,
    ServicesManager,
    Calendar,
}

/// Screens listed on the dashboard, in menu order.
const DASHBOARD_MENU: &[View] = &[
    View::SalesForm,
    View::Calendar,
    View::SellersManager,
    View::ServicesManager,
    View::CustomersManager,
    View::UsersList,
    View::Permissions,
    View::Database,
];

pub fn load(db: &DbState) -> AppResult<AppPermissions> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    match db::get_setting(&conn, PERMISSIONS_CATEGORY, PERMISSIONS_KEY) {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(AppPermissions::default()),
    }
}

pub fn save(db: &DbState, permissions: &AppPermissions) -> AppResult<()> {
    let raw = serde_json::to_string(permissions)?;
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    db::set_setting(&conn, PERMISSIONS_CATEGORY, PERMISSIONS_KEY, &raw)?;
    info!(permissions = %raw, "permissions saved");
    Ok(())
}

pub fn toggle(db: &DbState, key: &str) -> AppResult<AppPermissions> {
    let mut permissions = load(db)?;
    permissions.toggle(key)?;
    save(db, &permissions)?;
    Ok(permissions)
}

/// Whether `user` (None when logged out) may open `view`.
pub fn can_access(user: Option<&User>, permissions: &AppPermissions, view: View) -> bool {
    if matches!(view, View::Login | View::Register | View::ForgotPassword) {
        return true;
    }
    let Some(user) = user else {
        return false;
    };
    if user.is_admin() {
        return true;
    }
    match view {
        View::Dashboard | View::Calendar => true,
        View::UsersList | View::Permissions => false,
        View::SalesForm => permissions.show_sales_form,
        View::SellersManager => permissions.show_sellers_manager,
        View::CustomersManager => permissions.show_customers_manager,
        View::ServicesManager => permissions.show_services_manager,
        View::Database => permissions.show_database_designer,
        View::Login | View::Register | View::ForgotPassword => true,
    }
}

/// Fail with `Forbidden`/`NotLoggedIn` unless `user` may open `view`.
pub fn ensure_access(user: Option<&User>, permissions: &AppPermissions, view: View) -> AppResult<()> {
    if user.is_none() && !matches!(view, View::Login | View::Register | View::ForgotPassword) {
        return Err(AppError::NotLoggedIn);
    }
    if !can_access(user, permissions, view) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn assistant_visible(user: Option<&User>, permissions: &AppPermissions) -> bool {
    permissions.show_ai_assistant || user.is_some_and(User::is_admin)
}

pub fn analytics_visible(user: &User, permissions: &AppPermissions) -> bool {
    user.is_admin() || permissions.show_analytics
}

/// Dashboard entries the user can open.
pub fn dashboard_views(user: &User, permissions: &AppPermissions) -> Vec<View> {
    DASHBOARD_MENU
        .iter()
        .copied()
        .filter(|view| can_access(Some(user), permissions, *view))
        .collect()
}
