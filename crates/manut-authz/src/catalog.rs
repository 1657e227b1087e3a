//! Permission catalog: registration, lookup, activation and listing.

use manut_core::error::{ManutError, ManutResult};
use manut_core::models::permission::{CreatePermission, Permission, PermissionFilter};
use manut_core::repository::PermissionRepository;
use tracing::{debug, info};

/// Permissions installed by [`PermissionCatalog::seed_defaults`]:
/// `(module, action, description)`. Names are `module.action`.
pub const DEFAULT_CATALOG: &[(&str, &str, &str)] = &[
    ("users", "view", "Visualizar lista de usuários"),
    ("users", "create", "Criar novos usuários"),
    ("users", "edit", "Editar dados de usuários"),
    ("users", "delete", "Desativar usuários"),
    ("users", "permissions", "Gerenciar permissões de usuários"),
    ("maintenance", "view", "Visualizar solicitações de manutenção"),
    ("maintenance", "create", "Criar solicitações de manutenção"),
    ("maintenance", "edit", "Editar solicitações de manutenção"),
    ("maintenance", "approve", "Aprovar solicitações de manutenção"),
    ("maintenance", "execute", "Executar ordens de serviço"),
    ("reports", "view", "Visualizar relatórios básicos"),
    ("reports", "export", "Exportar relatórios"),
    ("reports", "advanced", "Acessar relatórios avançados"),
    ("settings", "view", "Visualizar configurações do sistema"),
    ("settings", "edit", "Editar configurações do sistema"),
    ("assets", "view", "Visualizar ativos"),
    ("assets", "create", "Criar ativos"),
    ("assets", "edit", "Editar ativos"),
    ("assets", "delete", "Excluir ativos"),
    ("assets", "maintenance", "Realizar manutenção em ativos"),
    ("planos_preventivos", "read", "Visualizar planos de manutenção preventiva"),
    ("planos_preventivos", "create", "Criar novos planos de manutenção preventiva"),
    ("planos_preventivos", "update", "Editar e executar planos de manutenção preventiva"),
    ("planos_preventivos", "delete", "Excluir planos de manutenção preventiva"),
    ("planos_preventivos", "stats", "Visualizar estatísticas de manutenção preventiva"),
    ("planos_preventivos", "calendario", "Visualizar calendário de manutenção preventiva"),
    ("estoque", "visualizar", "Visualizar informações de estoque"),
    ("estoque", "criar", "Criar itens, categorias e fornecedores"),
    ("estoque", "editar", "Editar itens, categorias e fornecedores"),
    ("estoque", "excluir", "Excluir itens, categorias e fornecedores"),
    ("estoque", "movimentar", "Criar movimentações de entrada e saída"),
    ("estoque", "relatorios", "Acessar relatórios de estoque"),
];

/// The set of known permissions.
///
/// Generic over the repository so the catalog has no dependency on the
/// database crate.
#[derive(Clone)]
pub struct PermissionCatalog<P: PermissionRepository> {
    repo: P,
}

impl<P: PermissionRepository> PermissionCatalog<P> {
    pub fn new(repo: P) -> Self {
        Self { repo }
    }

    /// Register a permission.
    ///
    /// Re-registering a name with identical fields returns the stored
    /// record unchanged. A name or `(module, action, resource)` key that
    /// is already taken by different fields is `DuplicatePermission`.
    pub async fn register(&self, input: CreatePermission) -> ManutResult<Permission> {
        self.register_inner(input).await.map(|(permission, _)| permission)
    }

    async fn register_inner(&self, input: CreatePermission) -> ManutResult<(Permission, bool)> {
        let input = normalize(input)?;

        if let Some(existing) = self.repo.find_by_name(&input.name).await? {
            return reuse_or_reject(existing, &input);
        }
        if let Some(existing) = self
            .repo
            .find_by_key(&input.module, &input.action, input.resource.as_deref())
            .await?
        {
            return Err(ManutError::DuplicatePermission {
                name: existing.name,
            });
        }

        match self.repo.create(input.clone()).await {
            Ok(permission) => {
                info!(permission = %permission.name, "permission registered");
                Ok((permission, true))
            }
            // Lost a race with a concurrent registration: settle against
            // whatever won. If nothing did, the other writer aborted too
            // and a second insert is uncontended.
            Err(ManutError::ConcurrentModification { .. }) => {
                match self.repo.find_by_name(&input.name).await? {
                    Some(existing) => reuse_or_reject(existing, &input),
                    None => {
                        debug!(permission = %input.name, "insert conflicted with no winner, retrying");
                        let permission = self.repo.create(input).await?;
                        info!(permission = %permission.name, "permission registered");
                        Ok((permission, true))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Look up a permission by name. Inactive permissions are returned.
    pub async fn find(&self, name: &str) -> ManutResult<Permission> {
        self.repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| ManutError::PermissionNotFound { name: name.into() })
    }

    /// Look up a permission by name, returning `None` when unknown.
    pub async fn lookup(&self, name: &str) -> ManutResult<Option<Permission>> {
        self.repo.find_by_name(name).await
    }

    /// Activate or deactivate a permission. Grants are left untouched;
    /// they simply stop (or resume) counting.
    pub async fn set_active(&self, name: &str, active: bool) -> ManutResult<Permission> {
        let permission = self
            .repo
            .set_active(name, active)
            .await?
            .ok_or_else(|| ManutError::PermissionNotFound { name: name.into() })?;
        info!(permission = %name, active, "permission activation changed");
        Ok(permission)
    }

    /// Active permissions of one module, ordered by name.
    pub async fn list_by_module(&self, module: &str) -> ManutResult<Vec<Permission>> {
        let mut permissions = self
            .repo
            .list(PermissionFilter {
                module: Some(module.to_string()),
                active: Some(true),
            })
            .await?;
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    pub async fn list(&self, filter: PermissionFilter) -> ManutResult<Vec<Permission>> {
        self.repo.list(filter).await
    }

    /// Distinct modules that have at least one active permission, sorted.
    pub async fn list_modules(&self) -> ManutResult<Vec<String>> {
        let permissions = self
            .repo
            .list(PermissionFilter {
                module: None,
                active: Some(true),
            })
            .await?;
        let mut modules: Vec<String> = permissions.into_iter().map(|p| p.module).collect();
        modules.sort();
        modules.dedup();
        Ok(modules)
    }

    /// Install [`DEFAULT_CATALOG`]. Entries already present are left as
    /// they are. Returns the number of permissions created.
    pub async fn seed_defaults(&self) -> ManutResult<usize> {
        let mut created = 0;
        for (module, action, description) in DEFAULT_CATALOG {
            let name = format!("{module}.{action}");
            if self.repo.find_by_name(&name).await?.is_some() {
                continue;
            }
            let input =
                CreatePermission::new(name, *module, *action).with_description(*description);
            if self.register_inner(input).await?.1 {
                created += 1;
            }
        }
        debug!(created, total = DEFAULT_CATALOG.len(), "default catalog seeded");
        Ok(created)
    }
}

fn reuse_or_reject(existing: Permission, input: &CreatePermission) -> ManutResult<(Permission, bool)> {
    if existing.matches(input) {
        debug!(permission = %existing.name, "permission already registered");
        Ok((existing, false))
    } else {
        Err(ManutError::DuplicatePermission {
            name: input.name.clone(),
        })
    }
}

fn normalize(input: CreatePermission) -> ManutResult<CreatePermission> {
    let required = |field: &str, value: String| -> ManutResult<String> {
        let value = value.trim().to_string();
        if value.is_empty() {
            Err(ManutError::Validation {
                message: format!("permission {field} must not be empty"),
            })
        } else {
            Ok(value)
        }
    };
    let optional = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(CreatePermission {
        name: required("name", input.name)?,
        module: required("module", input.module)?,
        action: required("action", input.action)?,
        resource: optional(input.resource),
        description: optional(input.description),
    })
}
