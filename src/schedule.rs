//! Meal schedule editing for an event and the employee's meal picker

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{Day, MealCategory};

fn default_meals() -> Vec<MealCategory> {
    ["Breakfast", "Lunch", "Dinner"]
        .iter()
        .zip(1..)
        .map(|(name, order)| MealCategory::new(name, order))
        .collect()
}

fn renumber(meals: &mut [MealCategory]) {
    for (meal, order) in meals.iter_mut().zip(1..) {
        meal.order = order;
    }
}

/// Per-day meal categories of one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealPlan {
    days: Vec<Day>,
    apply_to_all_days: bool,
}

impl MealPlan {
    /// One day per calendar day from `start` through `end`, each with breakfast, lunch and dinner
    pub fn initialize(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidDate(format!(
                "end date {} is before start date {}",
                dates::format_display(end),
                dates::format_display(start)
            )));
        }
        let days = dates::days_between(start, end)
            .zip(1..)
            .map(|(date, id)| Day {
                id,
                date: Some(date),
                meals: default_meals(),
            })
            .collect();
        Ok(Self {
            days,
            apply_to_all_days: false,
        })
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn day(&self, day_id: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.id == day_id)
    }

    fn day_mut(&mut self, day_id: u32) -> Result<&mut Day> {
        self.days
            .iter_mut()
            .find(|d| d.id == day_id)
            .ok_or_else(|| Error::general(format!("No day with id {}", day_id)))
    }

    pub fn apply_to_all_days(&self) -> bool {
        self.apply_to_all_days
    }

    pub fn set_apply_to_all_days(&mut self, value: bool) {
        self.apply_to_all_days = value;
    }

    /// Add a meal named `name` at the end of the day, or of every day when
    /// applying to all days. Days that already have the meal are skipped;
    /// the target day having it is an error.
    pub fn add_meal_category(&mut self, day_id: u32, name: &str) -> Result<MealCategory> {
        if name.trim().is_empty() {
            return Err(Error::general("Meal category name is required"));
        }
        let id = MealCategory::slug(name);
        let day = self.day_mut(day_id)?;
        if day.meals.iter().any(|m| m.id == id) {
            return Err(Error::general(format!("{} already exists on day {}", name.trim(), day_id)));
        }
        let meal = MealCategory::new(name, day.meals.len() as u32 + 1);

        if self.apply_to_all_days {
            for day in &mut self.days {
                if !day.meals.iter().any(|m| m.id == id) {
                    let order = day.meals.len() as u32 + 1;
                    day.meals.push(MealCategory { order, ..meal.clone() });
                }
            }
        } else {
            self.day_mut(day_id)?.meals.push(meal.clone());
        }
        Ok(meal)
    }

    pub fn remove_meal_category(&mut self, day_id: u32, meal_id: &str) -> Result<()> {
        let day = self.day_mut(day_id)?;
        let before = day.meals.len();
        day.meals.retain(|m| m.id != meal_id);
        if day.meals.len() == before {
            return Err(Error::general(format!("No meal {} on day {}", meal_id, day_id)));
        }
        renumber(&mut day.meals);
        Ok(())
    }

    /// Move the meal at `old_index` to `new_index`; orders become 1..n
    pub fn reorder_meals(&mut self, day_id: u32, old_index: usize, new_index: usize) -> Result<()> {
        let day = self.day_mut(day_id)?;
        let len = day.meals.len();
        if old_index >= len || new_index >= len {
            return Err(Error::general(format!(
                "Meal position out of range: {} -> {} of {}",
                old_index, new_index, len
            )));
        }
        let meal = day.meals.remove(old_index);
        day.meals.insert(new_index, meal);
        renumber(&mut day.meals);
        Ok(())
    }

    /// Replace every other day's meals with a copy of `source_day_id`'s
    pub fn copy_day_to_all(&mut self, source_day_id: u32) -> Result<()> {
        let meals = self
            .day(source_day_id)
            .map(|d| d.meals.clone())
            .ok_or_else(|| Error::general(format!("No day with id {}", source_day_id)))?;
        for day in self.days.iter_mut().filter(|d| d.id != source_day_id) {
            day.meals = meals.clone();
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Day accordion and meal selection on the employee meal screen
#[derive(Debug, Clone, Default)]
pub struct MealPicker {
    days: Vec<Day>,
    open_day: Option<u32>,
    selected: BTreeMap<u32, Vec<String>>,
}

impl MealPicker {
    pub fn new(days: Vec<Day>) -> Self {
        Self {
            days,
            ..Default::default()
        }
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    /// Open `day_id` and close the others; toggling the open day closes it
    pub fn toggle_day(&mut self, day_id: u32) {
        self.open_day = match self.open_day {
            Some(open) if open == day_id => None,
            _ if self.days.iter().any(|d| d.id == day_id) => Some(day_id),
            _ => None,
        };
    }

    pub fn is_open(&self, day_id: u32) -> bool {
        self.open_day == Some(day_id)
    }

    pub fn open_day(&self) -> Option<&Day> {
        let id = self.open_day?;
        self.days.iter().find(|d| d.id == id)
    }

    pub fn select_meals(&mut self, day_id: u32, categories: Vec<String>) {
        self.selected.insert(day_id, categories);
    }

    pub fn selected_meals(&self, day_id: u32) -> &[String] {
        self.selected.get(&day_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(days: u32) -> MealPlan {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = start + chrono::Duration::days(days as i64 - 1);
        MealPlan::initialize(start, end).unwrap()
    }

    fn meal_ids(plan: &MealPlan, day_id: u32) -> Vec<(String, u32)> {
        plan.day(day_id)
            .unwrap()
            .meals
            .iter()
            .map(|m| (m.id.clone(), m.order))
            .collect()
    }

    #[test]
    fn test_initialize_creates_default_meals() {
        let plan = plan(3);
        assert_eq!(plan.days().len(), 3);
        assert_eq!(plan.days()[2].id, 3);
        assert_eq!(plan.days()[2].date, NaiveDate::from_ymd_opt(2024, 3, 3));
        assert_eq!(
            meal_ids(&plan, 1),
            vec![("breakfast".to_string(), 1), ("lunch".to_string(), 2), ("dinner".to_string(), 3)]
        );
    }

    #[test]
    fn test_initialize_rejects_reversed_range() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(MealPlan::initialize(start, end), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_add_meal_to_one_day() {
        let mut plan = plan(2);
        let meal = plan.add_meal_category(1, "Evening Snacks").unwrap();
        assert_eq!(meal.id, "evening-snacks");
        assert_eq!(meal.order, 4);
        assert_eq!(plan.day(1).unwrap().meals.len(), 4);
        assert_eq!(plan.day(2).unwrap().meals.len(), 3);
        assert!(plan.add_meal_category(1, "evening snacks").is_err());
    }

    #[test]
    fn test_add_meal_to_all_days() {
        let mut plan = plan(3);
        plan.remove_meal_category(2, "lunch").unwrap();
        plan.set_apply_to_all_days(true);
        plan.add_meal_category(1, "Tea").unwrap();
        assert_eq!(meal_ids(&plan, 1).last().unwrap(), &("tea".to_string(), 4));
        assert_eq!(meal_ids(&plan, 2).last().unwrap(), &("tea".to_string(), 3));
        assert_eq!(plan.day(3).unwrap().meals.len(), 4);
    }

    #[test]
    fn test_remove_and_reorder_renumber() {
        let mut plan = plan(1);
        plan.remove_meal_category(1, "breakfast").unwrap();
        assert_eq!(meal_ids(&plan, 1), vec![("lunch".to_string(), 1), ("dinner".to_string(), 2)]);
        assert!(plan.remove_meal_category(1, "breakfast").is_err());

        plan.add_meal_category(1, "Brunch").unwrap();
        plan.reorder_meals(1, 2, 0).unwrap();
        assert_eq!(
            meal_ids(&plan, 1),
            vec![("brunch".to_string(), 1), ("lunch".to_string(), 2), ("dinner".to_string(), 3)]
        );
        assert!(plan.reorder_meals(1, 0, 3).is_err());
    }

    #[test]
    fn test_copy_day_to_all_and_reset() {
        let mut plan = plan(3);
        plan.add_meal_category(2, "Supper").unwrap();
        plan.copy_day_to_all(2).unwrap();
        assert_eq!(meal_ids(&plan, 1), meal_ids(&plan, 2));
        assert_eq!(meal_ids(&plan, 3), meal_ids(&plan, 2));
        assert!(plan.copy_day_to_all(9).is_err());

        plan.set_apply_to_all_days(true);
        plan.reset();
        assert!(plan.days().is_empty());
        assert!(!plan.apply_to_all_days());
    }

    #[test]
    fn test_picker_opens_one_day() {
        let mut picker = MealPicker::new(plan(3).days().to_vec());
        picker.toggle_day(2);
        assert!(picker.is_open(2));
        picker.toggle_day(3);
        assert!(picker.is_open(3) && !picker.is_open(2));
        picker.toggle_day(3);
        assert!(picker.open_day().is_none());
        picker.toggle_day(42);
        assert!(picker.open_day().is_none());

        picker.select_meals(1, vec!["Lunch".to_string()]);
        assert_eq!(picker.selected_meals(1), ["Lunch".to_string()]);
        assert!(picker.selected_meals(2).is_empty());
    }
}
