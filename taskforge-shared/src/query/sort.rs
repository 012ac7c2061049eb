/// Whitelisted sorting
///
/// Every list endpoint sorts by a field from a per-entity enum. The enum is
/// the only source of column names that ever reach SQL text; caller input is
/// parsed into it and unknown names are rejected with `InvalidInput`.
///
/// ORDER BY always ends with the entity's primary key so pages are stable
/// when the sort column has duplicates, and nullable columns sort
/// `NULLS LAST` in both directions.
///
/// # Example
///
/// ```
/// use taskforge_shared::query::sort::{Sort, TaskSortField};
///
/// let sort = Sort::<TaskSortField>::parse(Some("due_date"), Some("asc")).unwrap();
/// assert_eq!(sort.order_by_clause(), "ORDER BY t.due_date ASC NULLS LAST, t.id ASC");
///
/// assert!(Sort::<TaskSortField>::parse(Some("password_hash"), None).is_err());
/// ```

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

use crate::error::{ServiceError, ServiceResult};

/// Sort direction, descending unless asked otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(ServiceError::invalid(format!(
                "Unknown sort direction '{}'; expected asc or desc",
                other
            ))),
        }
    }
}

/// A sortable column of one entity
pub trait SortField: Copy + Debug + Default + FromStr<Err = ServiceError> {
    /// Qualified column name, e.g. `t.created_at`
    fn column(&self) -> &'static str;

    /// Whether the column may hold NULL
    fn nullable(&self) -> bool;

    /// Qualified primary key used as the final ORDER BY term
    fn tiebreaker() -> &'static str;
}

macro_rules! sort_fields {
    (@nullable nullable) => { true };
    (@nullable) => { false };
    (
        $(#[$meta:meta])*
        pub enum $name:ident (tiebreaker = $tie:literal, default = $default:ident) {
            $( $variant:ident => $key:literal : $column:literal $( [$nulls:ident] )? ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant ),+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $name {
            /// Field names accepted by the parser
            pub const ALLOWED: &'static [&'static str] = &[$( $key ),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $key ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ServiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $key => Ok($name::$variant), )+
                    other => Err(ServiceError::invalid(format!(
                        "Unknown sort field '{}'; allowed: {}",
                        other,
                        Self::ALLOWED.join(", ")
                    ))),
                }
            }
        }

        impl SortField for $name {
            fn column(&self) -> &'static str {
                match self {
                    $( $name::$variant => $column ),+
                }
            }

            fn nullable(&self) -> bool {
                match self {
                    $( $name::$variant => sort_fields!(@nullable $($nulls)?) ),+
                }
            }

            fn tiebreaker() -> &'static str {
                $tie
            }
        }
    };
}

sort_fields! {
    /// Task sort columns (table alias `t`)
    pub enum TaskSortField (tiebreaker = "t.id", default = CreatedAt) {
        CreatedAt => "created_at": "t.created_at",
        UpdatedAt => "updated_at": "t.updated_at",
        Title => "title": "t.title",
        DueDate => "due_date": "t.due_date" [nullable],
        Priority => "priority": "t.priority",
        Status => "status": "t.status",
    }
}

sort_fields! {
    /// Project sort columns (table alias `p`)
    pub enum ProjectSortField (tiebreaker = "p.id", default = CreatedAt) {
        CreatedAt => "created_at": "p.created_at",
        UpdatedAt => "updated_at": "p.updated_at",
        Name => "name": "p.name",
    }
}

sort_fields! {
    /// Organization sort columns (table alias `o`)
    pub enum OrganizationSortField (tiebreaker = "o.id", default = CreatedAt) {
        CreatedAt => "created_at": "o.created_at",
        Name => "name": "o.name",
    }
}

sort_fields! {
    /// Comment sort columns (table alias `c`)
    pub enum CommentSortField (tiebreaker = "c.id", default = CreatedAt) {
        CreatedAt => "created_at": "c.created_at",
    }
}

sort_fields! {
    /// Custom property sort columns (table alias `cp`)
    pub enum CustomPropertySortField (tiebreaker = "cp.id", default = CreatedAt) {
        CreatedAt => "created_at": "cp.created_at",
        Name => "name": "cp.name",
    }
}

sort_fields! {
    /// Member sort columns (table alias `m`, users joined as `u`)
    pub enum MemberSortField (tiebreaker = "m.user_id", default = JoinedAt) {
        JoinedAt => "joined_at": "m.joined_at",
        Username => "username": "u.username",
        Role => "role": "m.role",
    }
}

/// Field + direction for one list call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: SortField> Default for Sort<F> {
    fn default() -> Self {
        Self {
            field: F::default(),
            direction: SortDirection::default(),
        }
    }
}

impl<F: SortField> Sort<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parses optional caller input; missing parts fall back to the defaults
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> ServiceResult<Self> {
        let field = match field.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => name.parse()?,
            None => F::default(),
        };
        let direction = match direction.map(str::trim).filter(|s| !s.is_empty()) {
            Some(dir) => dir.parse()?,
            None => SortDirection::default(),
        };

        Ok(Self { field, direction })
    }

    /// Renders the ORDER BY clause from whitelisted identifiers only
    pub fn order_by_clause(&self) -> String {
        let dir = self.direction.as_sql();
        let nulls = if self.field.nullable() { " NULLS LAST" } else { "" };

        format!(
            "ORDER BY {} {}{}, {} {}",
            self.field.column(),
            dir,
            nulls,
            F::tiebreaker(),
            dir
        )
    }
}
