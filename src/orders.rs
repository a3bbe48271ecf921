//! In-memory service order registry.
//!
//! Identifiers are `OS` followed by a zero-padded sequence number drawn from
//! a monotonic counter, so a deleted id is never handed out again.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ModelError::invalid(format!("unknown priority \"{s}\""))),
        }
    }
}

/// Work status. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Scheduled,
        OrderStatus::InProgress,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Scheduled => "Scheduled",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ModelError;

    /// Accepts the display names and their snake/kebab spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| {
                status
                    .as_str()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase()
                    == key
            })
            .ok_or_else(|| ModelError::invalid(format!("unknown order status \"{s}\"")))
    }
}

/// A maintenance work order. `equipment` is an informational reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOrder {
    pub id: String,
    pub title: String,
    pub equipment: String,
    pub priority: Priority,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
    pub scheduled_at: NaiveDateTime,
    pub assignee: Option<String>,
    pub description: String,
}

/// Fields supplied when creating an order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewServiceOrder {
    pub title: String,
    pub equipment: String,
    pub priority: Priority,
    pub status: OrderStatus,
    pub scheduled_at: NaiveDateTime,
    pub assignee: Option<String>,
    pub description: String,
}

/// Ordered collection of service orders with id generation.
#[derive(Debug, Clone, Default)]
pub struct ServiceOrderRegistry {
    orders: Vec<ServiceOrder>,
    /// Highest sequence number issued or seeded so far.
    last_seq: u32,
}

impl ServiceOrderRegistry {
    pub fn new() -> Self {
        Self {
            orders: Vec::new(),
            last_seq: 0,
        }
    }

    /// Seeds a registry with existing orders; new ids continue after the
    /// highest sequence number present.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for malformed or duplicate ids.
    pub fn from_orders(orders: Vec<ServiceOrder>) -> Result<Self, ModelError> {
        let mut max_seq = 0;
        let mut seen = std::collections::HashSet::new();
        for order in &orders {
            let seq = parse_seq(&order.id)?;
            if !seen.insert(seq) {
                return Err(ModelError::invalid(format!(
                    "duplicate service order id {}",
                    order.id
                )));
            }
            max_seq = max_seq.max(seq);
        }
        Ok(Self {
            orders,
            last_seq: max_seq,
        })
    }

    /// The five demonstration orders OS001 to OS005.
    pub fn sample() -> Self {
        let orders = sample_orders();
        let last_seq = orders.len() as u32;
        Self { orders, last_seq }
    }

    /// Creates an order and returns it with its new id.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if title, equipment or
    /// description is blank, or once the id sequence is exhausted.
    pub fn create(
        &mut self,
        new: NewServiceOrder,
        created_at: NaiveDateTime,
    ) -> Result<&ServiceOrder, ModelError> {
        for (field, value) in [
            ("title", &new.title),
            ("equipment", &new.equipment),
            ("description", &new.description),
        ] {
            if value.trim().is_empty() {
                return Err(ModelError::invalid(format!(
                    "service order {field} is required"
                )));
            }
        }

        let seq = self.last_seq.checked_add(1).ok_or_else(|| {
            ModelError::invalid(format!(
                "service order ids exhausted after {}",
                format_id(self.last_seq)
            ))
        })?;
        self.last_seq = seq;
        let id = format_id(seq);
        info!(%id, title = %new.title, equipment = %new.equipment, "service order created");
        self.orders.push(ServiceOrder {
            id,
            title: new.title,
            equipment: new.equipment,
            priority: new.priority,
            status: new.status,
            created_at,
            scheduled_at: new.scheduled_at,
            assignee: new.assignee.filter(|a| !a.trim().is_empty()),
            description: new.description,
        });
        self.orders
            .last()
            .ok_or_else(|| ModelError::invalid("order vanished after insert"))
    }

    /// # Errors
    ///
    /// Returns [`ModelError::OrderNotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<&ServiceOrder, ModelError> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ModelError::OrderNotFound(id.to_string()))
    }

    /// All orders in creation order.
    pub fn list(&self) -> &[ServiceOrder] {
        &self.orders
    }

    /// Orders with the given status, or all orders for `None`.
    pub fn filter(&self, status: Option<OrderStatus>) -> Vec<&ServiceOrder> {
        self.orders
            .iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`ModelError::OrderNotFound`] for an unknown id.
    pub fn set_status(&mut self, id: &str, status: OrderStatus) -> Result<(), ModelError> {
        let order = self.get_mut(id)?;
        let from = order.status;
        order.status = status;
        info!(%id, %from, to = %status, "service order status changed");
        Ok(())
    }

    /// Assigns (or with `None`, unassigns) the order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::OrderNotFound`] for an unknown id.
    pub fn assign(&mut self, id: &str, assignee: Option<String>) -> Result<(), ModelError> {
        let order = self.get_mut(id)?;
        order.assignee = assignee.filter(|a| !a.trim().is_empty());
        info!(%id, assignee = ?order.assignee, "service order assigned");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ModelError::OrderNotFound`] for an unknown id.
    pub fn reschedule(&mut self, id: &str, scheduled_at: NaiveDateTime) -> Result<(), ModelError> {
        let order = self.get_mut(id)?;
        order.scheduled_at = scheduled_at;
        info!(%id, %scheduled_at, "service order rescheduled");
        Ok(())
    }

    /// Removes and returns an order. Its id is not reused.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::OrderNotFound`] for an unknown id.
    pub fn delete(&mut self, id: &str) -> Result<ServiceOrder, ModelError> {
        let pos = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| ModelError::OrderNotFound(id.to_string()))?;
        info!(%id, "service order deleted");
        Ok(self.orders.remove(pos))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ServiceOrder, ModelError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ModelError::OrderNotFound(id.to_string()))
    }
}

fn format_id(seq: u32) -> String {
    format!("OS{seq:03}")
}

fn parse_seq(id: &str) -> Result<u32, ModelError> {
    id.strip_prefix("OS")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ModelError::invalid(format!("malformed service order id \"{id}\"")))
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap_or_default()
}

fn sample_orders() -> Vec<ServiceOrder> {
    let order = |id: &str,
                 title: &str,
                 equipment: &str,
                 priority,
                 status,
                 created: &str,
                 scheduled: &str,
                 assignee: Option<&str>,
                 description: &str| ServiceOrder {
        id: id.to_string(),
        title: title.to_string(),
        equipment: equipment.to_string(),
        priority,
        status,
        created_at: at(created),
        scheduled_at: at(scheduled),
        assignee: assignee.map(str::to_string),
        description: description.to_string(),
    };

    vec![
        order(
            "OS001",
            "Communication failure Inverter 01",
            "Inverter 01",
            Priority::High,
            OrderStatus::InProgress,
            "2025-05-15T14:30:00",
            "2025-05-20T10:00:00",
            Some("Technician João Silva"),
            "Inverter is not communicating with the monitoring system.",
        ),
        order(
            "OS002",
            "Preventive maintenance String Box 02",
            "String Box 02",
            Priority::Medium,
            OrderStatus::Scheduled,
            "2025-05-16T09:15:00",
            "2025-05-25T09:00:00",
            Some("Technician Pedro Santos"),
            "Monthly preventive maintenance of String Box 02.",
        ),
        order(
            "OS003",
            "Module cleaning - Sector A",
            "PV modules",
            Priority::Low,
            OrderStatus::Completed,
            "2025-05-10T11:00:00",
            "2025-05-12T08:00:00",
            Some("Cleaning crew"),
            "Scheduled cleaning of the sector A PV modules.",
        ),
        order(
            "OS004",
            "Fuse replacement - String Box 01",
            "String Box 01",
            Priority::High,
            OrderStatus::Pending,
            "2025-05-18T16:45:00",
            "2025-05-22T14:00:00",
            None,
            "Blown fuse on string A of String Box 01.",
        ),
        order(
            "OS005",
            "Temperature check - Inverter 03",
            "Inverter 03",
            Priority::Medium,
            OrderStatus::InProgress,
            "2025-05-17T13:20:00",
            "2025-05-21T11:30:00",
            Some("Technician Roberto Alves"),
            "Check the high temperature logged on Inverter 03 over the last 24 hours.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(title: &str) -> NewServiceOrder {
        NewServiceOrder {
            title: title.to_string(),
            equipment: "Inverter 02".to_string(),
            description: "Check AC breaker".to_string(),
            ..NewServiceOrder::default()
        }
    }

    fn now() -> NaiveDateTime {
        at("2025-05-20T08:00:00")
    }

    #[test]
    fn sample_has_five_orders() {
        let reg = ServiceOrderRegistry::sample();
        let ids: Vec<&str> = reg.list().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["OS001", "OS002", "OS003", "OS004", "OS005"]);
        assert_eq!(reg.get("OS004").map(|o| o.assignee.clone()), Ok(None));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut reg = ServiceOrderRegistry::sample();
        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS006"));
        reg.delete("OS006").expect("OS006 exists");
        let id = reg.create(new_order("b"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS007"));
    }

    #[test]
    fn deleting_last_sample_does_not_recycle() {
        let mut reg = ServiceOrderRegistry::sample();
        reg.delete("OS005").expect("OS005 exists");
        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS006"));
    }

    #[test]
    fn empty_registry_starts_at_one() {
        let mut reg = ServiceOrderRegistry::new();
        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS001"));

        let mut reg = ServiceOrderRegistry::default();
        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS001"));
    }

    #[test]
    fn from_orders_continues_after_max() {
        let mut orders = sample_orders();
        orders.retain(|o| o.id != "OS002");
        orders[0].id = "OS041".to_string();
        let mut reg = ServiceOrderRegistry::from_orders(orders).expect("valid ids");
        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id.as_deref(), Ok("OS042"));
    }

    #[test]
    fn highest_possible_id_is_accepted_but_not_exceeded() {
        let mut orders = sample_orders();
        orders[4].id = format!("OS{}", u32::MAX);
        let mut reg = ServiceOrderRegistry::from_orders(orders).expect("u32::MAX is a valid id");
        assert_eq!(reg.len(), 5);

        assert!(matches!(
            reg.create(new_order("a"), now()),
            Err(ModelError::InvalidInput(_))
        ));
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn last_id_before_exhaustion_is_issued() {
        let mut orders = sample_orders();
        orders[4].id = format!("OS{}", u32::MAX - 1);
        let mut reg = ServiceOrderRegistry::from_orders(orders).expect("valid ids");

        let id = reg.create(new_order("a"), now()).map(|o| o.id.clone());
        assert_eq!(id, Ok(format!("OS{}", u32::MAX)));
        assert!(reg.create(new_order("b"), now()).is_err());
        assert_eq!(reg.len(), 6);
    }

    #[test]
    fn from_orders_rejects_bad_ids() {
        let mut orders = sample_orders();
        orders[1].id = "OS001".to_string();
        assert!(ServiceOrderRegistry::from_orders(orders).is_err());

        let mut orders = sample_orders();
        orders[0].id = "X-1".to_string();
        assert!(ServiceOrderRegistry::from_orders(orders).is_err());
    }

    #[test]
    fn create_requires_fields() {
        let mut reg = ServiceOrderRegistry::sample();
        let blank = NewServiceOrder {
            description: "  ".to_string(),
            ..new_order("x")
        };
        assert!(matches!(
            reg.create(blank, now()),
            Err(ModelError::InvalidInput(_))
        ));
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn filter_and_status_transitions() {
        let mut reg = ServiceOrderRegistry::sample();
        assert_eq!(reg.filter(Some(OrderStatus::InProgress)).len(), 2);
        assert_eq!(reg.filter(None).len(), 5);

        assert!(reg.set_status("OS003", OrderStatus::Pending).is_ok());
        assert!(reg.set_status("OS003", OrderStatus::Completed).is_ok());
        assert!(reg.set_status("OS004", OrderStatus::Completed).is_ok());
        assert_eq!(reg.filter(Some(OrderStatus::Completed)).len(), 2);
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let mut reg = ServiceOrderRegistry::sample();
        assert!(matches!(reg.get("OS999"), Err(ModelError::OrderNotFound(_))));
        assert!(matches!(
            reg.delete("OS999"),
            Err(ModelError::OrderNotFound(_))
        ));
        assert!(matches!(
            reg.set_status("OS999", OrderStatus::Completed),
            Err(ModelError::OrderNotFound(_))
        ));
        assert!(reg.assign("OS999", None).is_err());
        assert!(reg.reschedule("OS999", now()).is_err());
    }

    #[test]
    fn assign_and_reschedule() {
        let mut reg = ServiceOrderRegistry::sample();
        assert!(reg.assign("OS004", Some("Technician Ana".to_string())).is_ok());
        assert_eq!(
            reg.get("OS004").map(|o| o.assignee.clone()),
            Ok(Some("Technician Ana".to_string()))
        );
        let when = at("2025-06-01T09:00:00");
        assert!(reg.reschedule("OS004", when).is_ok());
        assert_eq!(reg.get("OS004").map(|o| o.scheduled_at), Ok(when));
    }

    #[test]
    fn status_and_priority_parse() {
        assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("In progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("completed".parse::<OrderStatus>(), Ok(OrderStatus::Completed));
        assert!("archived".parse::<OrderStatus>().is_err());
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
    }
}
