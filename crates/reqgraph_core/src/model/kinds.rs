//! Typed facades over [`Node`] for each [`NodeKind`].
//!
//! A facade is only a kind-checked `NodeRef` with named accessors; it adds no
//! state. Facades deref to `NodeRef`, so they can be passed to
//! [`crate::graph::connect`] and to save tasks directly.

use super::attr::AttrValue;
use super::kind::{NodeKind, COMMITTED_FIELD, LOCKED_FIELD};
use super::node::{Node, NodeError, NodeId, NodeRef, NodeResult};
use std::collections::HashSet;
use std::ops::Deref;

macro_rules! node_facade {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(NodeRef);

        impl $name {
            /// Creates a node of this kind with a fresh identity.
            pub fn new() -> Self {
                Self(Node::new($kind))
            }

            /// Returns the underlying shared node.
            pub fn node(&self) -> &NodeRef {
                &self.0
            }

            pub fn into_node(self) -> NodeRef {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Deref for $name {
            type Target = NodeRef;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl TryFrom<NodeRef> for $name {
            type Error = NodeError;

            fn try_from(node: NodeRef) -> Result<Self, Self::Error> {
                if node.kind() == $kind {
                    Ok(Self(node))
                } else {
                    Err(NodeError::WrongKind {
                        id: node.id(),
                        expected: $kind,
                        found: node.kind(),
                    })
                }
            }
        }
    };
}

node_facade!(
    /// Owner of projects. Can be locked against attribute changes.
    Organization => NodeKind::Organization
);
node_facade!(Project => NodeKind::Project);
node_facade!(
    /// Deliverable of a project. Commitable.
    Product => NodeKind::Product
);
node_facade!(
    /// A requirement. Starts uncommitted; once committed it is immutable.
    Requirement => NodeKind::Requirement
);
node_facade!(Story => NodeKind::Story);
node_facade!(UseCase => NodeKind::UseCase);
node_facade!(
    /// Entry point listed by `GraphService::list_graphs`.
    GraphNode => NodeKind::Graph
);
node_facade!(TimeEstimate => NodeKind::TimeEstimate);
node_facade!(
    /// Free-form note that can hang off any node.
    Text => NodeKind::Text
);
node_facade!(Completed => NodeKind::Completed);
node_facade!(KeyValue => NodeKind::KeyValue);
node_facade!(Effort => NodeKind::Effort);
node_facade!(Role => NodeKind::Role);
node_facade!(Actor => NodeKind::Actor);
node_facade!(Goal => NodeKind::Goal);
node_facade!(Purpose => NodeKind::Purpose);
node_facade!(
    /// Contact holder; email addresses, phone numbers and postal addresses
    /// are connected as children.
    Person => NodeKind::Person
);
node_facade!(EmailAddress => NodeKind::EmailAddress);
node_facade!(PhoneNumber => NodeKind::PhoneNumber);
node_facade!(InternationalAddress => NodeKind::InternationalAddress);
node_facade!(UsAddress => NodeKind::UsAddress);
node_facade!(Event => NodeKind::Event);
node_facade!(RecurringTodo => NodeKind::RecurringTodo);
node_facade!(Todo => NodeKind::Todo);

/// Text setter/getter pairs for plain text fields.
macro_rules! text_fields {
    ($facade:ident { $($setter:ident / $getter:ident => $field:literal),+ $(,)? }) => {
        impl $facade {
            $(
                pub fn $setter(&self, value: impl Into<String>) -> NodeResult<()> {
                    self.0.set_attr($field, value.into())
                }

                pub fn $getter(&self) -> String {
                    self.0.text($field)
                }
            )+
        }
    };
}

text_fields!(Text { set_text / text => "text" });
text_fields!(Completed { set_description / description => "description" });
text_fields!(KeyValue { set_key / key => "key", set_value / value => "value" });
text_fields!(Effort { set_text / text => "text" });
text_fields!(Role { set_who / who => "who" });
text_fields!(Actor { set_actor / actor => "actor" });
text_fields!(Goal {
    set_action / action => "action",
    set_outcome / outcome => "outcome",
    set_context / context => "context",
    set_target_date_confidence / target_date_confidence => "target_date_confidence",
    set_alignment / alignment => "alignment",
});
text_fields!(Purpose {
    set_description / description => "description",
    set_deadline_confidence / deadline_confidence => "deadline_confidence",
});
text_fields!(Person {
    set_last_name / last_name => "last_name",
    set_first_name / first_name => "first_name",
});
text_fields!(EmailAddress { set_address / address => "address" });
text_fields!(PhoneNumber {
    set_country_code / country_code => "country_code",
    set_number / number => "number",
    set_phone_type / phone_type => "phone_type",
});
text_fields!(InternationalAddress {
    set_country_code / country_code => "country_code",
    set_locality / locality => "locality",
    set_postal_code / postal_code => "postal_code",
});
text_fields!(UsAddress {
    set_city / city => "city",
    set_state / state => "state",
    set_zip_code / zip_code => "zip_code",
});
text_fields!(Event {
    set_name / name => "name",
    set_description / description => "description",
});
text_fields!(RecurringTodo { set_description / description => "description" });
text_fields!(Todo { set_description / description => "description" });

fn integer(node: &NodeRef, field: &str) -> i64 {
    node.attr(field).and_then(|value| value.as_i64()).unwrap_or(0)
}

impl Organization {
    pub fn set_name(&self, name: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("name", name.into())
    }

    pub fn name(&self) -> String {
        self.0.text("name")
    }

    pub fn lock(&self) -> NodeResult<()> {
        self.0.set_attr(LOCKED_FIELD, true)
    }

    pub fn unlock(&self) -> NodeResult<()> {
        self.0.set_attr(LOCKED_FIELD, false)
    }

    pub fn is_locked(&self) -> bool {
        self.0.flag(LOCKED_FIELD)
    }
}

impl Project {
    pub fn set_name(&self, name: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("name", name.into())
    }

    pub fn name(&self) -> String {
        self.0.text("name")
    }

    pub fn set_description(&self, description: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("description", description.into())
    }

    pub fn description(&self) -> String {
        self.0.text("description")
    }
}

impl Product {
    pub fn set_title(&self, title: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("title", title.into())
    }

    pub fn title(&self) -> String {
        self.0.text("title")
    }

    pub fn set_description(&self, description: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("description", description.into())
    }

    pub fn description(&self) -> String {
        self.0.text("description")
    }

    pub fn commit(&self) -> NodeResult<()> {
        self.0.set_attr(COMMITTED_FIELD, true)
    }

    pub fn is_committed(&self) -> bool {
        self.0.flag(COMMITTED_FIELD)
    }
}

impl Requirement {
    pub fn set_title(&self, title: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("title", title.into())
    }

    pub fn title(&self) -> String {
        self.0.text("title")
    }

    pub fn set_text(&self, text: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("text", text.into())
    }

    pub fn text(&self) -> String {
        self.0.text("text")
    }

    /// Marks the requirement functional (`true`) or non-functional.
    pub fn set_functional(&self, functional: bool) -> NodeResult<()> {
        self.0.set_attr("functional", functional)
    }

    pub fn is_functional(&self) -> bool {
        self.0.flag("functional")
    }

    pub fn commit(&self) -> NodeResult<()> {
        self.0.set_attr(COMMITTED_FIELD, true)
    }

    pub fn is_committed(&self) -> bool {
        self.0.flag(COMMITTED_FIELD)
    }
}

impl Story {
    pub fn set_title(&self, title: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("title", title.into())
    }

    pub fn title(&self) -> String {
        self.0.text("title")
    }

    pub fn set_goal(&self, goal: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("goal", goal.into())
    }

    pub fn goal(&self) -> String {
        self.0.text("goal")
    }

    pub fn set_benefit(&self, benefit: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("benefit", benefit.into())
    }

    pub fn benefit(&self) -> String {
        self.0.text("benefit")
    }

    pub fn commit(&self) -> NodeResult<()> {
        self.0.set_attr(COMMITTED_FIELD, true)
    }
}

impl UseCase {
    pub fn set_name(&self, name: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("name", name.into())
    }

    pub fn name(&self) -> String {
        self.0.text("name")
    }

    pub fn commit(&self) -> NodeResult<()> {
        self.0.set_attr(COMMITTED_FIELD, true)
    }
}

impl GraphNode {
    pub fn set_title(&self, title: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("title", title.into())
    }

    pub fn title(&self) -> String {
        self.0.text("title")
    }
}

impl TimeEstimate {
    pub fn set_text(&self, text: impl Into<String>) -> NodeResult<()> {
        self.0.set_attr("text", text.into())
    }

    /// Estimated duration in seconds, counted from the start timestamp.
    pub fn set_estimate_secs(&self, seconds: i64) -> NodeResult<()> {
        self.0.set_attr("estimate_secs", AttrValue::Integer(seconds))
    }

    pub fn estimate_secs(&self) -> i64 {
        self.0
            .attr("estimate_secs")
            .and_then(|value| value.as_i64())
            .unwrap_or(0)
    }

    /// Marks the estimate started at `epoch_ms`.
    pub fn start(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("start_timestamp", AttrValue::Timestamp(epoch_ms))?;
        self.0.set_attr("started", true)
    }

    pub fn start_timestamp(&self) -> Option<i64> {
        if !self.0.flag("started") {
            return None;
        }
        self.0.attr("start_timestamp").and_then(|value| value.as_i64())
    }
}

impl Effort {
    pub fn set_effort_secs(&self, seconds: i64) -> NodeResult<()> {
        self.0.set_attr("effort_secs", AttrValue::Integer(seconds))
    }

    pub fn effort_secs(&self) -> i64 {
        integer(&self.0, "effort_secs")
    }
}

impl Goal {
    pub fn set_target_date(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("target_date", AttrValue::Timestamp(epoch_ms))
    }

    pub fn target_date(&self) -> i64 {
        integer(&self.0, "target_date")
    }
}

impl Purpose {
    pub fn set_deadline(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("deadline", AttrValue::Timestamp(epoch_ms))
    }

    pub fn deadline(&self) -> i64 {
        integer(&self.0, "deadline")
    }
}

impl InternationalAddress {
    /// Appends one address line as a child `Text` node.
    pub fn add_line(&self, line: impl Into<String>) -> NodeResult<Text> {
        add_text_line(&self.0, line.into())
    }

    pub fn lines(&self) -> Vec<String> {
        text_lines(&self.0)
    }
}

impl UsAddress {
    /// Appends one address line as a child `Text` node.
    pub fn add_line(&self, line: impl Into<String>) -> NodeResult<Text> {
        add_text_line(&self.0, line.into())
    }

    pub fn lines(&self) -> Vec<String> {
        text_lines(&self.0)
    }
}

fn add_text_line(owner: &NodeRef, line: String) -> NodeResult<Text> {
    let text = Text::new();
    text.set_text(line)?;
    crate::graph::connect(owner, &text);
    Ok(text)
}

fn text_lines(owner: &NodeRef) -> Vec<String> {
    owner
        .children()
        .into_iter()
        .filter_map(|child| Text::try_from(child).ok())
        .map(|text| text.text())
        .collect()
}

/// How a recurring todo repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Every `recurring_interval` seconds.
    Seconds(i64),
    /// On day `recurring_interval` of every month.
    DayOfMonth(i64),
    /// On day `recurring_interval` of every year.
    DayOfYear(i64),
}

impl RecurringTodo {
    pub fn set_created(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("created", AttrValue::Timestamp(epoch_ms))
    }

    pub fn created(&self) -> i64 {
        integer(&self.0, "created")
    }

    /// Sets the interval and exactly one of the recurrence flags.
    pub fn set_recurrence(&self, recurrence: Recurrence) -> NodeResult<()> {
        let (interval, flag) = match recurrence {
            Recurrence::Seconds(value) => (value, "seconds"),
            Recurrence::DayOfMonth(value) => (value, "day_of_month"),
            Recurrence::DayOfYear(value) => (value, "day_of_year"),
        };
        self.0
            .set_attr("recurring_interval", AttrValue::Integer(interval))?;
        for name in ["seconds", "day_of_month", "day_of_year"] {
            self.0.set_attr(name, name == flag)?;
        }
        Ok(())
    }

    /// `None` until a recurrence flag is set.
    pub fn recurrence(&self) -> Option<Recurrence> {
        let interval = integer(&self.0, "recurring_interval");
        if self.0.flag("seconds") {
            Some(Recurrence::Seconds(interval))
        } else if self.0.flag("day_of_month") {
            Some(Recurrence::DayOfMonth(interval))
        } else if self.0.flag("day_of_year") {
            Some(Recurrence::DayOfYear(interval))
        } else {
            None
        }
    }
}

impl Todo {
    /// Spawns a todo tree from `template`.
    ///
    /// Each spawned todo copies its template's description and records the
    /// template identity in `spawned_from`. Recurring todos below the template
    /// spawn child todos in the same shape; other children are skipped and a
    /// template reached twice spawns once.
    pub fn from_recurring(template: &RecurringTodo) -> NodeResult<Self> {
        let root = Self::spawned_by(template)?;
        let mut seen: HashSet<NodeId> = HashSet::from([template.id()]);
        let mut stack = vec![(template.clone(), root.clone())];
        while let Some((source, todo)) = stack.pop() {
            for child in source.children() {
                let Ok(child) = RecurringTodo::try_from(child) else {
                    continue;
                };
                if !seen.insert(child.id()) {
                    continue;
                }
                let spawned = Self::spawned_by(&child)?;
                crate::graph::connect(&todo, &spawned);
                stack.push((child, spawned));
            }
        }
        Ok(root)
    }

    fn spawned_by(template: &RecurringTodo) -> NodeResult<Self> {
        let todo = Self::new();
        todo.set_description(template.description())?;
        todo.0.set_attr("spawned_from", template.id_string())?;
        Ok(todo)
    }

    pub fn set_created(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("created", AttrValue::Timestamp(epoch_ms))
    }

    pub fn created(&self) -> i64 {
        integer(&self.0, "created")
    }

    pub fn set_due(&self, epoch_ms: i64) -> NodeResult<()> {
        self.0.set_attr("due", AttrValue::Timestamp(epoch_ms))
    }

    pub fn due(&self) -> i64 {
        integer(&self.0, "due")
    }

    pub fn set_completed(&self, completed: bool) -> NodeResult<()> {
        self.0.set_attr("completed", completed)
    }

    pub fn is_completed(&self) -> bool {
        self.0.flag("completed")
    }

    /// Identity of the recurring todo this one was spawned from.
    pub fn spawned_from(&self) -> Option<NodeId> {
        NodeId::parse_str(&self.0.text("spawned_from")).ok()
    }
}
