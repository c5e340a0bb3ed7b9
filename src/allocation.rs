//! Assigning employees to positions before they are saved for an event

use crate::error::{Error, Result};
use crate::models::{AllocatedEmployee, AllocatedSection, Employee};

#[derive(Debug, Clone, Default)]
pub struct AllocationBoard {
    employees: Vec<Employee>,
    sections: Vec<AllocatedSection>,
    selected: Option<String>,
    search_term: String,
}

impl AllocationBoard {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            employees,
            ..Default::default()
        }
    }

    pub fn set_employees(&mut self, employees: Vec<Employee>) {
        self.employees = employees;
    }

    pub fn sections(&self) -> &[AllocatedSection] {
        &self.sections
    }

    pub fn selected_position(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a position, creating its empty section the first time
    pub fn select_position(&mut self, position: &str) {
        if !self.sections.iter().any(|s| s.position == position) {
            self.sections.push(AllocatedSection {
                position: position.to_string(),
                employees: Vec::new(),
            });
        }
        self.selected = Some(position.to_string());
    }

    /// Add to the selected section; returns false if already there
    pub fn add_employee(&mut self, employee: &Employee) -> Result<bool> {
        let selected = self
            .selected
            .as_deref()
            .ok_or_else(|| Error::general("Select a position first"))?;
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.position == selected)
            .ok_or_else(|| Error::general(format!("No section for {}", selected)))?;

        if section.employees.iter().any(|e| e.id == employee.id) {
            return Ok(false);
        }
        section.employees.push(AllocatedEmployee {
            id: employee.id,
            name: employee.name.clone(),
        });
        Ok(true)
    }

    pub fn remove_employee(&mut self, position: &str, employee_id: i64) {
        if let Some(section) = self.sections.iter_mut().find(|s| s.position == position) {
            section.employees.retain(|e| e.id != employee_id);
        }
    }

    /// Drop a section; clears the selection if it was selected
    pub fn remove_position(&mut self, position: &str) {
        self.sections.retain(|s| s.position != position);
        if self.selected.as_deref() == Some(position) {
            self.selected = None;
        }
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    /// Employees whose name, email or position contains the search term, ignoring case
    pub fn filtered_employees(&self) -> Vec<&Employee> {
        let term = self.search_term.trim().to_lowercase();
        if term.is_empty() {
            return self.employees.iter().collect();
        }
        let contains = |value: &Option<String>| {
            value
                .as_deref()
                .map_or(false, |v| v.to_lowercase().contains(&term))
        };
        self.employees
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&term) || contains(&e.email) || contains(&e.position)
            })
            .collect()
    }
}
