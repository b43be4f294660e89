use std::sync::Arc;

use async_trait::async_trait;

use tessera_core::{AppError, AppResult, NonEmptyString};
use tessera_domain::{
    MembershipStatus, MembershipTier, MembershipTierId, Role, SubscriptionTier,
    SubscriptionTierId, UserId, member_role_name,
};

use crate::membership_ports::{
    CreateMembershipInput, CreateSubscriptionTierInput, MembershipRepository,
    SubscriptionTierRepository,
};
use crate::role_ports::{RoleRepository, RoleTemplateRepository};
use crate::user_ports::UserRepository;

/// Capability surface for membership lifecycle operations.
///
/// The default implementation is [`MembershipService`];
/// [`SubscriptionAdminService`] composes it and adds tier administration.
/// Deployments select an implementation at construction.
#[async_trait]
pub trait MembershipOperations: Send + Sync {
    /// Creates an active membership with an explicit role set.
    async fn create_membership(&self, input: CreateMembershipInput) -> AppResult<MembershipTier>;

    /// Cancels a membership; cancelling twice is a no-op.
    async fn cancel_membership(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<MembershipTier>;

    /// Returns the user's active membership, if any.
    async fn active_membership(&self, user_id: UserId) -> AppResult<Option<MembershipTier>>;

    /// Expands the membership's tier templates into freshly stamped roles.
    async fn assign_roles_from_tier(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<Vec<Role>>;
}

/// Default membership lifecycle implementation.
#[derive(Clone)]
pub struct MembershipService {
    memberships: Arc<dyn MembershipRepository>,
    tiers: Arc<dyn SubscriptionTierRepository>,
    templates: Arc<dyn RoleTemplateRepository>,
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
}

impl MembershipService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        tiers: Arc<dyn SubscriptionTierRepository>,
        templates: Arc<dyn RoleTemplateRepository>,
        roles: Arc<dyn RoleRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            memberships,
            tiers,
            templates,
            roles,
            users,
        }
    }
}

#[async_trait]
impl MembershipOperations for MembershipService {
    async fn create_membership(&self, input: CreateMembershipInput) -> AppResult<MembershipTier> {
        let user = self
            .users
            .get(input.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", input.user_id)))?;

        let tier = self
            .tiers
            .get(input.subscription_tier_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "subscription tier '{}'",
                    input.subscription_tier_id
                ))
            })?;

        let invite = input.invite.map(NonEmptyString::new).transpose()?;

        // Unknown role ids are dropped by the filter-by-id-set contract.
        let initial_roles = self.roles.list_by_ids(&input.role_ids).await?;

        let membership = MembershipTier::new(
            MembershipTierId::new(),
            user.id(),
            tier.id(),
            invite,
            initial_roles.iter().map(|role| role.id()).collect(),
        );

        self.memberships.insert(membership).await
    }

    async fn cancel_membership(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<MembershipTier> {
        let membership = self
            .memberships
            .get(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;

        if membership.status() == MembershipStatus::Cancelled {
            return Ok(membership);
        }

        self.memberships
            .set_status(membership_id, MembershipStatus::Cancelled)
            .await
    }

    async fn active_membership(&self, user_id: UserId) -> AppResult<Option<MembershipTier>> {
        self.memberships.active_for_user(user_id).await
    }

    async fn assign_roles_from_tier(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<Vec<Role>> {
        let membership = self
            .memberships
            .get(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;

        let tier = self
            .tiers
            .get(membership.subscription_tier_id())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "subscription tier '{}'",
                    membership.subscription_tier_id()
                ))
            })?;

        let user = self
            .users
            .get(membership.user_id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", membership.user_id())))?;

        let templates = self.templates.list_by_ids(tier.role_template_ids()).await?;

        // Every expansion stamps fresh roles, even when an identical one
        // already exists; membership grants are uniquified per member by
        // name, not deduplicated by identity.
        let mut granted = Vec::with_capacity(templates.len());
        for template in &templates {
            let name = member_role_name(template.name().as_str(), user.username());
            let role = Role::from_template(template, name, Vec::new(), Vec::new())?;
            let stored = self.roles.insert(role).await?;
            self.memberships
                .add_role(membership_id, stored.id())
                .await?;
            granted.push(stored);
        }

        Ok(granted)
    }
}

/// Extension implementation adding subscription tier administration.
#[derive(Clone)]
pub struct SubscriptionAdminService {
    inner: MembershipService,
    tiers: Arc<dyn SubscriptionTierRepository>,
    templates: Arc<dyn RoleTemplateRepository>,
}

impl SubscriptionAdminService {
    /// Composes the default membership operations with tier administration.
    #[must_use]
    pub fn new(
        inner: MembershipService,
        tiers: Arc<dyn SubscriptionTierRepository>,
        templates: Arc<dyn RoleTemplateRepository>,
    ) -> Self {
        Self {
            inner,
            tiers,
            templates,
        }
    }

    /// Creates a subscription tier and attaches its role templates.
    ///
    /// Unknown template ids are dropped silently; only the resolved set is
    /// attached.
    pub async fn create_subscription_tier(
        &self,
        input: CreateSubscriptionTierInput,
    ) -> AppResult<SubscriptionTier> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation(
                "subscription tier title must not be empty".to_owned(),
            ));
        }

        let resolved = self.templates.list_by_ids(&input.role_template_ids).await?;

        let tier = SubscriptionTier::new(
            SubscriptionTierId::new(),
            input.title,
            input.description,
            input.price_minor,
            input.is_active,
            input.payment_plan,
            resolved.iter().map(|template| template.id()).collect(),
        )?;

        self.tiers.insert(tier).await
    }
}

#[async_trait]
impl MembershipOperations for SubscriptionAdminService {
    async fn create_membership(&self, input: CreateMembershipInput) -> AppResult<MembershipTier> {
        self.inner.create_membership(input).await
    }

    async fn cancel_membership(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<MembershipTier> {
        self.inner.cancel_membership(membership_id).await
    }

    async fn active_membership(&self, user_id: UserId) -> AppResult<Option<MembershipTier>> {
        self.inner.active_membership(user_id).await
    }

    async fn assign_roles_from_tier(
        &self,
        membership_id: MembershipTierId,
    ) -> AppResult<Vec<Role>> {
        self.inner.assign_roles_from_tier(membership_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use tessera_core::{AppError, AppResult};
    use tessera_domain::{
        AccessLevel, MembershipStatus, MembershipTier, MembershipTierId, Role, RoleId,
        RoleIdentity, RoleTemplate, RoleTemplateId, RoleType, SubscriptionTier,
        SubscriptionTierId, User, UserId, Username,
    };

    use crate::membership_ports::{
        CreateMembershipInput, CreateSubscriptionTierInput, MembershipRepository,
        SubscriptionTierRepository,
    };
    use crate::role_ports::{RoleChange, RoleRepository, RoleTemplateRepository};
    use crate::user_ports::UserRepository;

    use super::{MembershipOperations, MembershipService, SubscriptionAdminService};

    #[derive(Default)]
    struct FakeMembershipRepository {
        memberships: Mutex<Vec<MembershipTier>>,
    }

    #[async_trait]
    impl MembershipRepository for FakeMembershipRepository {
        async fn insert(&self, membership: MembershipTier) -> AppResult<MembershipTier> {
            let mut memberships = self.memberships.lock().await;
            let has_active = memberships.iter().any(|stored| {
                stored.user_id() == membership.user_id()
                    && stored.status() == MembershipStatus::Active
            });
            if has_active {
                return Err(AppError::Conflict(format!(
                    "user '{}' already has an active membership",
                    membership.user_id()
                )));
            }

            memberships.push(membership.clone());
            Ok(membership)
        }

        async fn get(
            &self,
            membership_id: MembershipTierId,
        ) -> AppResult<Option<MembershipTier>> {
            Ok(self
                .memberships
                .lock()
                .await
                .iter()
                .find(|membership| membership.id() == membership_id)
                .cloned())
        }

        async fn set_status(
            &self,
            membership_id: MembershipTierId,
            status: MembershipStatus,
        ) -> AppResult<MembershipTier> {
            let mut memberships = self.memberships.lock().await;
            let membership = memberships
                .iter_mut()
                .find(|membership| membership.id() == membership_id)
                .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;

            if status == MembershipStatus::Cancelled {
                membership.cancel();
            }

            Ok(membership.clone())
        }

        async fn active_for_user(&self, user_id: UserId) -> AppResult<Option<MembershipTier>> {
            Ok(self
                .memberships
                .lock()
                .await
                .iter()
                .find(|membership| {
                    membership.user_id() == user_id
                        && membership.status() == MembershipStatus::Active
                })
                .cloned())
        }

        async fn add_role(
            &self,
            membership_id: MembershipTierId,
            role_id: RoleId,
        ) -> AppResult<()> {
            let mut memberships = self.memberships.lock().await;
            let membership = memberships
                .iter_mut()
                .find(|membership| membership.id() == membership_id)
                .ok_or_else(|| AppError::NotFound(format!("membership '{membership_id}'")))?;
            membership.grant_role(role_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTierRepository {
        tiers: Mutex<Vec<SubscriptionTier>>,
    }

    #[async_trait]
    impl SubscriptionTierRepository for FakeTierRepository {
        async fn insert(&self, tier: SubscriptionTier) -> AppResult<SubscriptionTier> {
            self.tiers.lock().await.push(tier.clone());
            Ok(tier)
        }

        async fn get(&self, tier_id: SubscriptionTierId) -> AppResult<Option<SubscriptionTier>> {
            Ok(self
                .tiers
                .lock()
                .await
                .iter()
                .find(|tier| tier.id() == tier_id)
                .cloned())
        }
    }

    #[derive(Default)]
    struct FakeTemplateRepository {
        templates: Mutex<Vec<RoleTemplate>>,
    }

    #[async_trait]
    impl RoleTemplateRepository for FakeTemplateRepository {
        async fn find_by_name(&self, name: &str) -> AppResult<Option<RoleTemplate>> {
            Ok(self
                .templates
                .lock()
                .await
                .iter()
                .find(|template| template.name().as_str() == name)
                .cloned())
        }

        async fn insert_if_absent(&self, template: RoleTemplate) -> AppResult<RoleTemplate> {
            self.templates.lock().await.push(template.clone());
            Ok(template)
        }

        async fn list_by_ids(&self, ids: &[RoleTemplateId]) -> AppResult<Vec<RoleTemplate>> {
            Ok(self
                .templates
                .lock()
                .await
                .iter()
                .filter(|template| ids.contains(&template.id()))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeRoleRepository {
        roles: Mutex<Vec<Role>>,
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn find_by_identity(&self, identity: &RoleIdentity) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| &role.identity() == identity)
                .cloned())
        }

        async fn insert(&self, role: Role) -> AppResult<Role> {
            self.roles.lock().await.push(role.clone());
            Ok(role)
        }

        async fn update(&self, role: Role) -> AppResult<Role> {
            Ok(role)
        }

        async fn reuse_or_insert(&self, role: Role) -> AppResult<RoleChange> {
            self.roles.lock().await.push(role.clone());
            Ok(RoleChange {
                role,
                created: true,
            })
        }

        async fn get(&self, role_id: RoleId) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.id() == role_id)
                .cloned())
        }

        async fn list_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .filter(|role| ids.contains(&role.id()))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn insert(&self, user: User) -> AppResult<User> {
            self.users.lock().await.push(user.clone());
            Ok(user)
        }

        async fn get(&self, user_id: UserId) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id() == user_id)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.username().as_str() == username)
                .cloned())
        }
    }

    struct Fixture {
        service: MembershipService,
        admin: SubscriptionAdminService,
        roles: Arc<FakeRoleRepository>,
        templates: Arc<FakeTemplateRepository>,
        tiers: Arc<FakeTierRepository>,
        users: Arc<FakeUserRepository>,
        memberships: Arc<FakeMembershipRepository>,
    }

    fn fixture() -> Fixture {
        let memberships = Arc::new(FakeMembershipRepository::default());
        let tiers = Arc::new(FakeTierRepository::default());
        let templates = Arc::new(FakeTemplateRepository::default());
        let roles = Arc::new(FakeRoleRepository::default());
        let users = Arc::new(FakeUserRepository::default());

        let service = MembershipService::new(
            memberships.clone(),
            tiers.clone(),
            templates.clone(),
            roles.clone(),
            users.clone(),
        );
        let admin =
            SubscriptionAdminService::new(service.clone(), tiers.clone(), templates.clone());

        Fixture {
            service,
            admin,
            roles,
            templates,
            tiers,
            users,
            memberships,
        }
    }

    async fn seed_user(fixture: &Fixture, username: &str) -> AppResult<User> {
        let user = User::new(UserId::new(), Username::new(username)?, username, None)?;
        fixture.users.insert(user.clone()).await?;
        Ok(user)
    }

    async fn seed_tier(
        fixture: &Fixture,
        title: &str,
        role_template_ids: Vec<RoleTemplateId>,
    ) -> AppResult<SubscriptionTier> {
        let tier = SubscriptionTier::new(
            SubscriptionTierId::new(),
            title,
            "",
            4900,
            true,
            json!({}),
            role_template_ids,
        )?;
        fixture.tiers.insert(tier.clone()).await?;
        Ok(tier)
    }

    async fn seed_template(fixture: &Fixture, name: &str) -> AppResult<RoleTemplate> {
        let template = RoleTemplate::new(
            RoleTemplateId::new(),
            name,
            AccessLevel::Global,
            RoleType::new("member")?,
        )?;
        fixture.templates.insert_if_absent(template.clone()).await?;
        Ok(template)
    }

    #[tokio::test]
    async fn membership_is_created_active_with_explicit_roles() -> AppResult<()> {
        let fixture = fixture();
        let user = seed_user(&fixture, "alice").await?;
        let tier = seed_tier(&fixture, "Gold", Vec::new()).await?;

        let membership = fixture
            .service
            .create_membership(CreateMembershipInput {
                user_id: user.id(),
                subscription_tier_id: tier.id(),
                invite: None,
                role_ids: Vec::new(),
            })
            .await?;

        assert_eq!(membership.status(), MembershipStatus::Active);
        assert!(membership.role_ids().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn second_active_membership_is_rejected() -> AppResult<()> {
        let fixture = fixture();
        let user = seed_user(&fixture, "alice").await?;
        let tier = seed_tier(&fixture, "Gold", Vec::new()).await?;

        let input = CreateMembershipInput {
            user_id: user.id(),
            subscription_tier_id: tier.id(),
            invite: None,
            role_ids: Vec::new(),
        };
        fixture.service.create_membership(input.clone()).await?;
        let second = fixture.service.create_membership(input).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn cancel_twice_is_a_no_op() -> AppResult<()> {
        let fixture = fixture();
        let user = seed_user(&fixture, "alice").await?;
        let tier = seed_tier(&fixture, "Gold", Vec::new()).await?;

        let membership = fixture
            .service
            .create_membership(CreateMembershipInput {
                user_id: user.id(),
                subscription_tier_id: tier.id(),
                invite: None,
                role_ids: Vec::new(),
            })
            .await?;

        let first = fixture.service.cancel_membership(membership.id()).await?;
        let second = fixture.service.cancel_membership(membership.id()).await?;

        assert_eq!(first.status(), MembershipStatus::Cancelled);
        assert_eq!(second.status(), MembershipStatus::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_membership_is_not_active() -> AppResult<()> {
        let fixture = fixture();
        let user = seed_user(&fixture, "alice").await?;
        let tier = seed_tier(&fixture, "Gold", Vec::new()).await?;

        let membership = fixture
            .service
            .create_membership(CreateMembershipInput {
                user_id: user.id(),
                subscription_tier_id: tier.id(),
                invite: None,
                role_ids: Vec::new(),
            })
            .await?;
        assert!(fixture.service.active_membership(user.id()).await?.is_some());

        fixture.service.cancel_membership(membership.id()).await?;
        assert!(fixture.service.active_membership(user.id()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn tier_expansion_stamps_fresh_roles_every_time() -> AppResult<()> {
        let fixture = fixture();
        let user = seed_user(&fixture, "alice").await?;
        let template = seed_template(&fixture, "Manager").await?;
        let tier = seed_tier(&fixture, "Gold", vec![template.id()]).await?;

        let membership = fixture
            .service
            .create_membership(CreateMembershipInput {
                user_id: user.id(),
                subscription_tier_id: tier.id(),
                invite: None,
                role_ids: Vec::new(),
            })
            .await?;

        let first = fixture
            .service
            .assign_roles_from_tier(membership.id())
            .await?;
        let second = fixture
            .service
            .assign_roles_from_tier(membership.id())
            .await?;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id(), second[0].id());
        assert_eq!(first[0].name().as_str(), "Manager - alice");
        assert_eq!(second[0].name().as_str(), "Manager - alice");

        let stored = fixture
            .memberships
            .get(membership.id())
            .await?
            .ok_or_else(|| AppError::NotFound("membership".to_owned()))?;
        assert_eq!(stored.role_ids().len(), 2);
        assert_eq!(fixture.roles.roles.lock().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn empty_tier_title_is_rejected() {
        let fixture = fixture();

        let result = fixture
            .admin
            .create_subscription_tier(CreateSubscriptionTierInput {
                title: String::new(),
                description: String::new(),
                price_minor: 0,
                is_active: true,
                payment_plan: json!({}),
                role_template_ids: Vec::new(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_template_ids_are_dropped_from_tier() -> AppResult<()> {
        let fixture = fixture();

        let tier = fixture
            .admin
            .create_subscription_tier(CreateSubscriptionTierInput {
                title: "Gold".to_owned(),
                description: String::new(),
                price_minor: 4900,
                is_active: true,
                payment_plan: json!({"interval": "monthly"}),
                role_template_ids: vec![RoleTemplateId::new()],
            })
            .await?;

        assert!(tier.role_template_ids().is_empty());
        Ok(())
    }
}
