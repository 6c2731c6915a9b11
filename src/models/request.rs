use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::models::{criteria::PagingSearchCriteria, payload::NotificationPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub email: String,
    pub password_hash: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserByIdRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserBadgesRequest {
    pub user_id: String,

    #[serde(default)]
    pub criteria: PagingSearchCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserNotificationsRequest {
    pub user_id: String,

    #[serde(default)]
    pub criteria: PagingSearchCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBankAccountsRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationRequest {
    pub user_id: String,
    pub payload: NotificationPayload,
}

/// Every command and query the bus can route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Login(LoginRequest),
    RegisterUser(RegisterUserRequest),
    GetUserById(GetUserByIdRequest),
    GetUserBadges(GetUserBadgesRequest),
    GetUserNotifications(GetUserNotificationsRequest),
    GetBankAccounts(GetBankAccountsRequest),
    PushNotification(PushNotificationRequest),
}

impl Request {
    /// Clamps the page size of query criteria to `max_page_size`.
    pub fn with_page_limit(self, max_page_size: u32) -> Self {
        match self {
            Request::GetUserBadges(mut inner) => {
                inner.criteria = inner.criteria.clamped(max_page_size);
                Request::GetUserBadges(inner)
            }
            Request::GetUserNotifications(mut inner) => {
                inner.criteria = inner.criteria.clamped(max_page_size);
                Request::GetUserNotifications(inner)
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Login,
    RegisterUser,
    GetUserById,
    GetUserBadges,
    GetUserNotifications,
    GetBankAccounts,
    PushNotification,
}

impl RequestKind {
    pub const ALL: [RequestKind; 7] = [
        RequestKind::Login,
        RequestKind::RegisterUser,
        RequestKind::GetUserById,
        RequestKind::GetUserBadges,
        RequestKind::GetUserNotifications,
        RequestKind::GetBankAccounts,
        RequestKind::PushNotification,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Slot of this kind in a handler table.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Login => "login",
            RequestKind::RegisterUser => "registerUser",
            RequestKind::GetUserById => "getUserById",
            RequestKind::GetUserBadges => "getUserBadges",
            RequestKind::GetUserNotifications => "getUserNotifications",
            RequestKind::GetBankAccounts => "getBankAccounts",
            RequestKind::PushNotification => "pushNotification",
        }
    }
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete request shape bound to exactly one `Request` variant.
pub trait TypedRequest: Sized + Send + 'static {
    const KIND: RequestKind;

    fn from_request(request: Request) -> Option<Self>;
}

macro_rules! typed_request {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        impl Request {
            pub fn kind(&self) -> RequestKind {
                match self {
                    $(Request::$variant(_) => RequestKind::$variant,)+
                }
            }
        }

        $(
            impl TypedRequest for $ty {
                const KIND: RequestKind = RequestKind::$variant;

                fn from_request(request: Request) -> Option<Self> {
                    match request {
                        Request::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Request {
                fn from(inner: $ty) -> Self {
                    Request::$variant(inner)
                }
            }
        )+
    };
}

typed_request! {
    Login => LoginRequest,
    RegisterUser => RegisterUserRequest,
    GetUserById => GetUserByIdRequest,
    GetUserBadges => GetUserBadgesRequest,
    GetUserNotifications => GetUserNotificationsRequest,
    GetBankAccounts => GetBankAccountsRequest,
    PushNotification => PushNotificationRequest,
}
