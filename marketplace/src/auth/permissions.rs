use crate::{
    api::models::users::{CurrentUser, UserType},
    errors::Error,
    types::{Operation, Permission, Resource, UserId},
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

/// Declare zero-sized marker types that name an enum value at the type level
macro_rules! markers {
    ($target:ident => $($name:ident),+ $(,)?) => {
        $(
            #[derive(Default)]
            pub struct $name;

            impl From<$name> for $target {
                fn from(_: $name) -> $target {
                    $target::$name
                }
            }
        )+
    };
}

pub mod resource {
    use crate::types::Resource;

    markers!(Resource => Users, Profiles, CustomerRequests, Leads, Credits, Reviews, Stats);
}

pub mod operation {
    use crate::types::Operation;

    markers!(Operation => CreateAll, CreateOwn, ReadAll, ReadOwn, UpdateAll, UpdateOwn, DeleteAll, DeleteOwn);
}

/// Extractor that authenticates the caller and checks that their account
/// type grants `O` on `R`. Missing credentials reject with 401, a role
/// mismatch with 403.
pub struct RequiresPermission<R, O>
where
    R: Into<Resource> + Default,
    O: Into<Operation> + Default,
{
    pub current_user: CurrentUser,
    _marker: PhantomData<(R, O)>,
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: Into<Resource> + Default,
    O: Into<Operation> + Default,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current_user = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;

        let resource = R::default().into();
        let operation = O::default().into();

        if has_permission(&current_user, resource, operation) {
            Ok(RequiresPermission {
                current_user,
                _marker: PhantomData,
            })
        } else {
            Err(Error::InsufficientPermissions {
                required: Permission::Allow(resource, operation),
                action: operation,
                resource: resource.to_string(),
            })
        }
    }
}

impl<R, O> std::ops::Deref for RequiresPermission<R, O>
where
    R: Into<Resource> + Default,
    O: Into<Operation> + Default,
{
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.current_user
    }
}

pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    role_has_permission(user.user_type, resource, operation)
}

/// Each side of the marketplace acts on its own records only. Admins hold
/// every `*All` operation but none of the role-specific `*Own` ones, so a
/// professional endpoint rejects an admin just as it rejects a customer.
pub fn role_has_permission(user_type: UserType, resource: Resource, operation: Operation) -> bool {
    use Operation::*;

    match user_type {
        UserType::Admin => {
            matches!(operation, CreateAll | ReadAll | UpdateAll | DeleteAll)
                || matches!((resource, operation), (Resource::Users, ReadOwn | UpdateOwn))
        }
        UserType::Professional => matches!(
            (resource, operation),
            (Resource::Users, ReadOwn | UpdateOwn)
                | (Resource::Profiles, CreateOwn | ReadOwn | UpdateOwn)
                | (Resource::Leads, CreateOwn | ReadOwn | UpdateOwn)
                | (Resource::Credits, CreateOwn | ReadOwn)
        ),
        UserType::Customer => matches!(
            (resource, operation),
            (Resource::Users, ReadOwn | UpdateOwn)
                | (Resource::CustomerRequests, CreateOwn | ReadOwn | UpdateOwn | DeleteOwn)
                | (Resource::Reviews, CreateOwn | ReadOwn | DeleteOwn)
        ),
    }
}

fn can_perform_own_operation(user: &CurrentUser, resource: Resource, operation: Operation, owner_id: UserId) -> bool {
    user.id == owner_id && has_permission(user, resource, operation)
}

fn can_perform_all_operation(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    has_permission(user, resource, operation)
}

macro_rules! generate_permission_helpers {
    ($operation_name:ident, $all_operation:expr, $own_operation:expr) => {
        paste::paste! {
            /// Whether the user may [<$operation_name:lower>] a record they own
            pub fn [<can_ $operation_name:lower _own_resource>](user: &CurrentUser, resource: Resource, owner_id: UserId) -> bool {
                can_perform_own_operation(user, resource, $own_operation, owner_id)
            }

            /// Whether the user may [<$operation_name:lower>] any record of the type
            pub fn [<can_ $operation_name:lower _all_resources>](user: &CurrentUser, resource: Resource) -> bool {
                can_perform_all_operation(user, resource, $all_operation)
            }
        }
    };
}

generate_permission_helpers!(delete, Operation::DeleteAll, Operation::DeleteOwn);

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(user_type: UserType) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            user_type,
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
        }
    }

    #[test]
    fn test_professional_role() {
        let pro = user(UserType::Professional);

        assert!(has_permission(&pro, Resource::Profiles, Operation::CreateOwn));
        assert!(has_permission(&pro, Resource::Leads, Operation::CreateOwn));
        assert!(has_permission(&pro, Resource::Credits, Operation::ReadOwn));

        assert!(!has_permission(&pro, Resource::CustomerRequests, Operation::CreateOwn));
        assert!(!has_permission(&pro, Resource::Reviews, Operation::CreateOwn));
        assert!(!has_permission(&pro, Resource::Stats, Operation::ReadAll));
    }

    #[test]
    fn test_customer_role() {
        let customer = user(UserType::Customer);

        assert!(has_permission(&customer, Resource::CustomerRequests, Operation::DeleteOwn));
        assert!(has_permission(&customer, Resource::Reviews, Operation::CreateOwn));

        assert!(!has_permission(&customer, Resource::Leads, Operation::ReadOwn));
        assert!(!has_permission(&customer, Resource::Credits, Operation::CreateOwn));
        assert!(!has_permission(&customer, Resource::Users, Operation::ReadAll));
    }

    #[test]
    fn test_admin_holds_all_but_not_role_specific_own() {
        let admin = user(UserType::Admin);

        assert!(has_permission(&admin, Resource::Users, Operation::UpdateAll));
        assert!(has_permission(&admin, Resource::Leads, Operation::DeleteAll));
        assert!(has_permission(&admin, Resource::Stats, Operation::ReadAll));
        assert!(has_permission(&admin, Resource::Users, Operation::ReadOwn));

        assert!(!has_permission(&admin, Resource::Profiles, Operation::CreateOwn));
        assert!(!has_permission(&admin, Resource::Credits, Operation::ReadOwn));
        assert!(!has_permission(&admin, Resource::CustomerRequests, Operation::CreateOwn));
    }

    #[test]
    fn test_delete_helpers() {
        let customer = user(UserType::Customer);
        let admin = user(UserType::Admin);

        assert!(can_delete_own_resource(&customer, Resource::Reviews, customer.id));
        assert!(!can_delete_own_resource(&customer, Resource::Reviews, Uuid::new_v4()));
        assert!(!can_delete_all_resources(&customer, Resource::Reviews));
        assert!(can_delete_all_resources(&admin, Resource::Reviews));
    }

    #[test]
    fn test_requires_permission_deref() {
        let pro = user(UserType::Professional);
        let extracted = RequiresPermission::<resource::Leads, operation::ReadOwn> {
            current_user: pro.clone(),
            _marker: PhantomData,
        };

        assert_eq!(extracted.id, pro.id);
        assert!(!extracted.is_admin());
    }
}
