//! Interaction
//!
//! Gestures reported by the rendering collaborator become [`Command`]s for
//! the host. The controller never touches graph state; it only tracks the
//! open context menu, an armed connection source and the view state the
//! gestures select.
//!
//! # Gestures
//!
//! | Gesture                         | Result                                   |
//! |---------------------------------|------------------------------------------|
//! | click node                      | `Select`, or completes an armed connect  |
//! | right-click                     | context menu for the target              |
//! | connect task → task             | `CreateDependency` of type `blocks`      |
//! | connect involving an agent      | nothing                                  |
//! | key press                       | shortcut, unless a text field has focus  |

use smallvec::SmallVec;
use tracing::debug;

use crate::entity::{DependencyType, NewDependency};
use crate::model::{NodeId, NodeKind};
use crate::view::{GroupBy, ViewMode, ViewState};

/// Viewport operations carried out by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportCommand {
    FitView,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ShowHelp,
}

/// Commands emitted to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select { entity_id: String, kind: NodeKind },
    CreateDependency(NewDependency),
    /// Remove the relation behind a rendered edge id.
    DeleteEdge(String),
    SetGroupBy(GroupBy),
    SetViewMode(ViewMode),
    Relayout,
    Viewport(ViewportCommand),
}

/// What a right-click landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuTarget {
    Node(NodeId),
    Edge(String),
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    ViewDetails { entity_id: String, kind: NodeKind },
    /// Arm the connection source; the next task click completes it.
    AddDependencyFrom(NodeId),
    RemoveConnection(String),
    GroupBy(GroupBy),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    /// Destructive actions are styled as such.
    pub danger: bool,
}

impl MenuItem {
    fn new(label: &'static str, action: MenuAction) -> Self {
        Self {
            label,
            action,
            danger: false,
        }
    }
}

/// An open context menu at screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub target: MenuTarget,
    pub x: f64,
    pub y: f64,
    pub items: SmallVec<[MenuItem; 2]>,
}

impl ContextMenu {
    fn for_target(target: MenuTarget, x: f64, y: f64) -> Self {
        let mut items = SmallVec::new();
        match &target {
            MenuTarget::Node(id) => match id.parse() {
                Some((NodeKind::Task, task_id)) => {
                    items.push(MenuItem::new(
                        "View Task Details",
                        MenuAction::ViewDetails {
                            entity_id: task_id.to_owned(),
                            kind: NodeKind::Task,
                        },
                    ));
                    items.push(MenuItem::new(
                        "Add Dependency From Here",
                        MenuAction::AddDependencyFrom(id.clone()),
                    ));
                }
                Some((NodeKind::Agent, agent_id)) => {
                    items.push(MenuItem::new(
                        "View Agent Details",
                        MenuAction::ViewDetails {
                            entity_id: agent_id.to_owned(),
                            kind: NodeKind::Agent,
                        },
                    ));
                }
                None => {}
            },
            MenuTarget::Edge(edge_id) => items.push(MenuItem {
                label: "Remove Connection",
                action: MenuAction::RemoveConnection(edge_id.clone()),
                danger: true,
            }),
            MenuTarget::Background => {
                items.push(MenuItem::new("Group by Workspace", MenuAction::GroupBy(GroupBy::Workspace)));
                items.push(MenuItem::new("Group by Role", MenuAction::GroupBy(GroupBy::Role)));
            }
        }
        Self { target, x, y, items }
    }
}

/// Transient gesture state of one view instance.
#[derive(Debug, Default)]
pub struct InteractionController {
    view: ViewState,
    menu: Option<ContextMenu>,
    connection_source: Option<NodeId>,
}

impl InteractionController {
    /// Create a controller with the default view and nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// View state selected by gestures so far.
    pub fn view(&self) -> ViewState {
        self.view
    }

    /// The open context menu, if any.
    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    /// Task armed by "Add Dependency From Here".
    pub fn connection_source(&self) -> Option<&NodeId> {
        self.connection_source.as_ref()
    }

    /// Back to the default view with nothing open.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A node was clicked.
    pub fn click_node(&mut self, id: &NodeId) -> Option<Command> {
        self.menu = None;
        if let Some(source) = self.connection_source.take() {
            return self.connect(&source, id);
        }
        let (kind, entity_id) = id.parse()?;
        Some(Command::Select {
            entity_id: entity_id.to_owned(),
            kind,
        })
    }

    /// Empty canvas was clicked: close the menu and disarm any connection.
    pub fn click_background(&mut self) {
        self.menu = None;
        self.connection_source = None;
    }

    /// Open the context menu for `target`. Targets without any applicable
    /// action open nothing.
    pub fn right_click(&mut self, target: MenuTarget, x: f64, y: f64) -> Option<&ContextMenu> {
        let menu = ContextMenu::for_target(target, x, y);
        self.menu = (!menu.items.is_empty()).then_some(menu);
        self.menu.as_ref()
    }

    /// Close the open menu, if any.
    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    /// Pick item `index` of the open menu. The menu closes either way.
    pub fn choose(&mut self, index: usize) -> Option<Command> {
        let menu = self.menu.take()?;
        let item = menu.items.into_iter().nth(index)?;
        match item.action {
            MenuAction::ViewDetails { entity_id, kind } => Some(Command::Select { entity_id, kind }),
            MenuAction::AddDependencyFrom(source) => {
                self.connection_source = Some(source);
                None
            }
            MenuAction::RemoveConnection(edge_id) => Some(Command::DeleteEdge(edge_id)),
            MenuAction::GroupBy(group_by) => {
                self.view.group_by = group_by;
                Some(Command::SetGroupBy(group_by))
            }
        }
    }

    /// A connection was dragged from `source` to `target`.
    ///
    /// Only task-to-task connections between distinct tasks produce a
    /// dependency; everything else is ignored.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Option<Command> {
        self.connection_source = None;
        match (source.parse(), target.parse()) {
            (Some((NodeKind::Task, from)), Some((NodeKind::Task, to))) if from != to => {
                Some(Command::CreateDependency(NewDependency {
                    source_task_id: from.to_owned(),
                    target_task_id: to.to_owned(),
                    dependency_type: DependencyType::Blocks,
                }))
            }
            _ => {
                debug!(source = %source, target = %target, "ignoring connection");
                None
            }
        }
    }

    /// Handle a key press. Shortcuts are case-insensitive and ignored while
    /// a text field has focus.
    pub fn key_press(&mut self, key: char, input_focused: bool) -> Option<Command> {
        if input_focused {
            return None;
        }
        let command = match key.to_ascii_lowercase() {
            '\u{1b}' => {
                self.close_menu();
                return None;
            }
            'f' => Command::Viewport(ViewportCommand::FitView),
            'l' => Command::Relayout,
            'g' => {
                self.view.mode = self.view.mode.toggled();
                Command::SetViewMode(self.view.mode)
            }
            '+' | '=' => Command::Viewport(ViewportCommand::ZoomIn),
            '-' => Command::Viewport(ViewportCommand::ZoomOut),
            '0' => Command::Viewport(ViewportCommand::ResetZoom),
            '?' => Command::Viewport(ViewportCommand::ShowHelp),
            _ => return None,
        };
        Some(command)
    }
}
