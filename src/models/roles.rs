use serde::{Deserialize, Serialize};

/// Semantic purpose a record field can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Start,
    End,
    Label,
    Dependencies,
    ColorBy,
    Progress,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Start,
        Role::End,
        Role::Label,
        Role::Dependencies,
        Role::ColorBy,
        Role::Progress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Start => "start",
            Role::End => "end",
            Role::Label => "label",
            Role::Dependencies => "dependencies",
            Role::ColorBy => "color_by",
            Role::Progress => "progress",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Role::Start),
            "end" => Some(Role::End),
            "label" => Some(Role::Label),
            "dependencies" | "depends" => Some(Role::Dependencies),
            "color_by" | "color-by" | "colorBy" => Some(Role::ColorBy),
            "progress" => Some(Role::Progress),
            _ => None,
        }
    }
}

/// Mapping from role to field name; `None` means unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub start: Option<String>,
    pub end: Option<String>,
    pub label: Option<String>,
    pub dependencies: Option<String>,
    pub color_by: Option<String>,
    pub progress: Option<String>,
}

impl RoleAssignment {
    pub fn get(&self, role: Role) -> Option<&str> {
        self.slot(role).as_deref()
    }

    pub fn set(&mut self, role: Role, field: Option<String>) {
        *self.slot_mut(role) = field.filter(|f| !f.trim().is_empty());
    }

    pub fn is_set(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Role a field is already assigned to, if any
    pub fn role_of(&self, field: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| self.get(*role) == Some(field))
    }

    /// All assigned (role, field) pairs in role order
    pub fn assigned(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|field| (role, field)))
    }

    fn slot(&self, role: Role) -> &Option<String> {
        match role {
            Role::Start => &self.start,
            Role::End => &self.end,
            Role::Label => &self.label,
            Role::Dependencies => &self.dependencies,
            Role::ColorBy => &self.color_by,
            Role::Progress => &self.progress,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Start => &mut self.start,
            Role::End => &mut self.end,
            Role::Label => &mut self.label,
            Role::Dependencies => &mut self.dependencies,
            Role::ColorBy => &mut self.color_by,
            Role::Progress => &mut self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("colorBy"), Some(Role::ColorBy));
        assert_eq!(Role::from_str("owner"), None);
    }

    #[test]
    fn test_assignment_set_and_lookup() {
        let mut roles = RoleAssignment::default();
        roles.set(Role::Start, Some("start".to_string()));
        roles.set(Role::End, Some("  ".to_string()));
        roles.set(Role::Progress, Some("percent".to_string()));

        assert_eq!(roles.get(Role::Start), Some("start"));
        assert!(!roles.is_set(Role::End));
        assert_eq!(roles.role_of("percent"), Some(Role::Progress));
        assert_eq!(roles.role_of("nothing"), None);

        let assigned: Vec<_> = roles.assigned().collect();
        assert_eq!(assigned, vec![(Role::Start, "start"), (Role::Progress, "percent")]);
    }
}
