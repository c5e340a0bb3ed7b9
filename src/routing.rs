//! Which dashboard pages each role may open

use event_staffing_auth::{Role, UserData};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    SuperadminDashboard,
    EventGroups,
    EventGroupProfile,
    SuperadminEvents,
    ExpiredEvents,
    AdminWelcome,
    AdminPhoto,
    AdminDashboard,
    AdminEvents,
    AdminEventFood,
    AdminEmployees,
    AdminEmployeeDetails,
    AdminEmployeeAllocation,
    AdminRegisteredUsers,
    AdminUserDetails,
    EmployeeDashboard,
    EmployeeIdCard,
    EmployeeMealScanner,
    EmployeeCheckIn,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Register => "/register",
            Route::SuperadminDashboard => "/",
            Route::EventGroups => "/event-groups",
            Route::EventGroupProfile => "/event-groups/:id",
            Route::SuperadminEvents => "/events-superadmin",
            Route::ExpiredEvents => "/expiredevents-superadmin",
            Route::AdminWelcome => "/admin",
            Route::AdminPhoto => "/admin/profile-photo",
            Route::AdminDashboard => "/admin/dashboard",
            Route::AdminEvents => "/admin/events",
            Route::AdminEventFood => "/admin/event-food",
            Route::AdminEmployees => "/admin/employees",
            Route::AdminEmployeeDetails => "/admin/employee-details",
            Route::AdminEmployeeAllocation => "/admin/employee-allocation",
            Route::AdminRegisteredUsers => "/admin/registered-users",
            Route::AdminUserDetails => "/admin/user/:id",
            Route::EmployeeDashboard => "/employee/dashboard",
            Route::EmployeeIdCard => "/employee/id-card",
            Route::EmployeeMealScanner => "/employee/meal-scanner",
            Route::EmployeeCheckIn => "/employee/check-in",
        }
    }

    /// Roles allowed in; empty for public pages
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Route::Login | Route::Register => &[],
            Route::SuperadminDashboard
            | Route::EventGroups
            | Route::EventGroupProfile
            | Route::SuperadminEvents
            | Route::ExpiredEvents => &[Role::Superadmin],
            Route::AdminWelcome
            | Route::AdminPhoto
            | Route::AdminDashboard
            | Route::AdminEvents
            | Route::AdminEventFood
            | Route::AdminEmployees
            | Route::AdminEmployeeDetails
            | Route::AdminEmployeeAllocation
            | Route::AdminRegisteredUsers
            | Route::AdminUserDetails => &[Role::Admin],
            Route::EmployeeDashboard
            | Route::EmployeeIdCard
            | Route::EmployeeMealScanner
            | Route::EmployeeCheckIn => &[Role::Employee],
        }
    }

    pub fn is_public(&self) -> bool {
        self.allowed_roles().is_empty()
    }
}

/// First page after login
pub fn landing_path(role: Role) -> &'static str {
    match role {
        Role::Superadmin => Route::SuperadminDashboard.path(),
        Role::Admin => Route::AdminDashboard.path(),
        Role::Employee => Route::EmployeeDashboard.path(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

pub fn authorize(user: Option<&UserData>, route: Route) -> Access {
    if route.is_public() {
        return Access::Allow;
    }
    match user {
        None => Access::Redirect(LOGIN_PATH),
        Some(user) if route.allowed_roles().contains(&user.role) => Access::Allow,
        Some(user) => Access::Redirect(landing_path(user.role)),
    }
}
