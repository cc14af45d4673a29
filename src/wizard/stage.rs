use serde::Serialize;

/// Where the wizard stands, keyed by which selections exist and whether the
/// ingredient-filtered candidates carry any pharmaceutical form.
///
/// The wizard starts as a three-step flow and only shrinks to two steps once
/// a disease and an ingredient are chosen and no form is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    ChooseDisease,
    ChooseIngredient,
    ChooseForm,
    CompleteWithoutForm,
    CompleteWithForm,
}

impl WizardStage {
    pub fn resolve(
        disease_selected: bool,
        ingredient_selected: bool,
        form_selected: bool,
        forms_available: bool,
    ) -> Self {
        match (disease_selected, ingredient_selected) {
            (false, _) => Self::ChooseDisease,
            (true, false) => Self::ChooseIngredient,
            (true, true) if !forms_available => Self::CompleteWithoutForm,
            (true, true) if form_selected => Self::CompleteWithForm,
            (true, true) => Self::ChooseForm,
        }
    }

    pub fn current_step(self) -> u8 {
        match self {
            Self::ChooseDisease => 1,
            Self::ChooseIngredient | Self::CompleteWithoutForm => 2,
            Self::ChooseForm | Self::CompleteWithForm => 3,
        }
    }

    pub fn total_steps(self) -> u8 {
        match self {
            Self::CompleteWithoutForm => 2,
            _ => 3,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, Self::CompleteWithoutForm | Self::CompleteWithForm)
    }

    pub fn needs_form_step(self) -> bool {
        self != Self::CompleteWithoutForm
    }

    /// Exact progress; only display code rounds it.
    pub fn progress_percent(self) -> f64 {
        if self.is_complete() {
            return 100.0;
        }
        f64::from(self.current_step() - 1) / f64::from(self.total_steps()) * 100.0
    }

    pub fn progress_display(self) -> u8 {
        self.progress_percent().round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::WizardStage;

    #[test]
    fn resolves_each_stage() {
        assert_eq!(
            WizardStage::resolve(false, false, false, true),
            WizardStage::ChooseDisease
        );
        assert_eq!(
            WizardStage::resolve(false, false, false, false),
            WizardStage::ChooseDisease
        );
        assert_eq!(
            WizardStage::resolve(true, false, false, false),
            WizardStage::ChooseIngredient
        );
        assert_eq!(
            WizardStage::resolve(true, true, false, true),
            WizardStage::ChooseForm
        );
        assert_eq!(
            WizardStage::resolve(true, true, true, true),
            WizardStage::CompleteWithForm
        );
        assert_eq!(
            WizardStage::resolve(true, true, false, false),
            WizardStage::CompleteWithoutForm
        );
    }

    #[test]
    fn steps_and_totals() {
        assert_eq!(WizardStage::ChooseDisease.current_step(), 1);
        assert_eq!(WizardStage::ChooseIngredient.current_step(), 2);
        assert_eq!(WizardStage::ChooseForm.current_step(), 3);
        assert_eq!(WizardStage::CompleteWithForm.current_step(), 3);
        assert_eq!(WizardStage::CompleteWithoutForm.current_step(), 2);

        assert_eq!(WizardStage::ChooseIngredient.total_steps(), 3);
        assert_eq!(WizardStage::CompleteWithoutForm.total_steps(), 2);
        assert!(!WizardStage::ChooseForm.is_complete());
        assert!(WizardStage::CompleteWithoutForm.is_complete());
        assert!(!WizardStage::CompleteWithoutForm.needs_form_step());
        assert!(WizardStage::ChooseDisease.needs_form_step());
    }

    #[test]
    fn progress_rounds_only_for_display() {
        assert_eq!(WizardStage::ChooseDisease.progress_percent(), 0.0);
        let step_two = WizardStage::ChooseIngredient.progress_percent();
        assert!((step_two - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(WizardStage::ChooseIngredient.progress_display(), 33);
        assert_eq!(WizardStage::ChooseForm.progress_display(), 67);
        assert_eq!(WizardStage::CompleteWithoutForm.progress_percent(), 100.0);
        assert_eq!(WizardStage::CompleteWithForm.progress_display(), 100);
    }
}
