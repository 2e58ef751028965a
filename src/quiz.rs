use crate::nodes::{ExerciseNode, MasteryModel, NodeDefaults, SingleSelectQuestion};
use crate::xml::Element;

const OBJECTIVE_TAG: &str = "objective";
const QUESTION_TAG: &str = "question";
const PROMPT_TAG: &str = "prompt";
const CHOICE_TAG: &str = "choice";
const CHOICE_QUESTION_TYPE: &str = "choice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub id: Option<String>,
    pub name: String,
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub kind: String,
    pub prompt: String,
    pub choices: Vec<ChoiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRecord {
    pub text: String,
    pub correct: bool,
}

/// Collects every `<objective>` in the document, wherever it is nested.
pub fn parse_objectives(root: &Element) -> Vec<Objective> {
    root.iter(OBJECTIVE_TAG).map(objective_from_element).collect()
}

fn objective_from_element(element: &Element) -> Objective {
    Objective {
        id: element.attr("id").map(str::to_owned),
        name: element.attr("name").unwrap_or_default().trim().to_owned(),
        questions: element
            .find_all(QUESTION_TAG)
            .map(|question| QuestionRecord {
                kind: question.attr("type").unwrap_or_default().to_owned(),
                prompt: question
                    .find(PROMPT_TAG)
                    .map(|prompt| prompt.text().trim().to_owned())
                    .unwrap_or_default(),
                choices: question
                    .find_all(CHOICE_TAG)
                    .map(|choice| ChoiceRecord {
                        text: choice.text().trim().to_owned(),
                        correct: choice
                            .attr("correct")
                            .is_some_and(|flag| flag.eq_ignore_ascii_case("true")),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Rebuilds the exercise a knowledge check points at.
///
/// An unknown reference, or a choice question with no correct-flagged
/// choice, means the package is corrupt and the run must stop.
pub fn reconstruct(
    reference: Option<&str>,
    objectives: &[Objective],
    title: &str,
    id_prefix: &str,
    defaults: &NodeDefaults,
) -> anyhow::Result<ExerciseNode> {
    let objective = objectives
        .iter()
        .find(|objective| reference.is_some() && objective.id.as_deref() == reference)
        .ok_or_else(|| {
            anyhow::anyhow!("knowledge check {title:?} references unknown objective {reference:?}")
        })?;
    let objective_id = objective.id.as_deref().unwrap_or_default();

    let mut questions = Vec::new();
    for (idx, question) in objective.questions.iter().enumerate() {
        if question.kind != CHOICE_QUESTION_TYPE {
            tracing::debug!(objective = objective_id, kind = %question.kind, "skipping question type");
            continue;
        }
        let correct = question
            .choices
            .iter()
            .find(|choice| choice.correct)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "objective {objective_id:?} question {idx} has no correct choice: {:?}",
                    question.prompt
                )
            })?;

        questions.push(SingleSelectQuestion {
            id: format!("{id_prefix}-{objective_id}-q{idx}"),
            question: question.prompt.clone(),
            correct_answer: correct.text.clone(),
            all_answers: question
                .choices
                .iter()
                .map(|choice| choice.text.clone())
                .collect(),
        });
    }

    let title = if objective.name.is_empty() {
        title.to_owned()
    } else {
        objective.name.clone()
    };

    Ok(ExerciseNode {
        title,
        source_id: format!("{id_prefix}-{objective_id}"),
        license: defaults.license.clone(),
        language: defaults.language.clone(),
        tags: defaults.tags.clone(),
        mastery: MasteryModel::all_two_in_a_row(),
        randomize: true,
        questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{License, MasteryKind};

    fn defaults() -> NodeDefaults {
        NodeDefaults {
            license: License {
                id: "CC BY-NC-SA".to_owned(),
                copyright_holder: "Publisher".to_owned(),
            },
            language: "en".to_owned(),
            tags: Vec::new(),
        }
    }

    const OBJECTIVES: &str = r#"<course><objectives>
      <objective id="obj-1" name="Check your knowledge">
        <question type="choice">
          <prompt>What is a mouse?</prompt>
          <choice>A keyboard</choice>
          <choice correct="true">A pointing device</choice>
          <choice>A monitor</choice>
        </question>
        <question type="match"><prompt>Ignored</prompt></question>
        <question type="choice">
          <prompt>Which is storage?</prompt>
          <choice correct="true">A hard drive</choice>
          <choice correct="true">A second flag</choice>
        </question>
        <question type="choice">
          <prompt>What opens web pages?</prompt>
          <choice>A printer</choice>
          <choice correct="TRUE">A browser</choice>
        </question>
      </objective>
      <objective id="obj-2" name="">
        <question type="choice"><prompt>Broken</prompt><choice>No answer</choice></question>
      </objective>
    </objectives></course>"#;

    #[test]
    fn rebuilds_choice_questions_with_flagged_answer() -> anyhow::Result<()> {
        let root = Element::parse(OBJECTIVES)?;
        let objectives = parse_objectives(&root);
        assert_eq!(objectives.len(), 2);

        let exercise = reconstruct(Some("obj-1"), &objectives, "Knowledge check", "lesson", &defaults())?;
        assert_eq!(exercise.title, "Check your knowledge");
        assert_eq!(exercise.source_id, "lesson-obj-1");
        assert_eq!(exercise.questions.len(), 3);

        let correct = exercise
            .questions
            .iter()
            .map(|q| q.correct_answer.as_str())
            .collect::<Vec<_>>();
        assert_eq!(correct, vec!["A pointing device", "A hard drive", "A browser"]);
        assert_eq!(exercise.questions[0].all_answers.len(), 3);
        assert_eq!(exercise.questions[0].question, "What is a mouse?");
        assert_eq!(exercise.mastery.kind, MasteryKind::DoAll);
        assert_eq!((exercise.mastery.m, exercise.mastery.n), (2, 2));
        assert!(exercise.randomize);
        Ok(())
    }

    #[test]
    fn unknown_reference_is_fatal() -> anyhow::Result<()> {
        let root = Element::parse(OBJECTIVES)?;
        let objectives = parse_objectives(&root);
        let err = reconstruct(Some("obj-9"), &objectives, "Knowledge check", "lesson", &defaults())
            .unwrap_err();
        assert!(err.to_string().contains("unknown objective"));
        Ok(())
    }

    #[test]
    fn choice_without_correct_flag_is_fatal() -> anyhow::Result<()> {
        let root = Element::parse(OBJECTIVES)?;
        let objectives = parse_objectives(&root);
        let err = reconstruct(Some("obj-2"), &objectives, "Knowledge check", "lesson", &defaults())
            .unwrap_err();
        assert!(err.to_string().contains("no correct choice"));
        Ok(())
    }

    #[test]
    fn missing_reference_never_matches_objective_without_id() -> anyhow::Result<()> {
        let root = Element::parse(
            r#"<objectives><objective name="Anonymous">
                 <question type="choice"><prompt>Q</prompt><choice correct="true">A</choice></question>
               </objective></objectives>"#,
        )?;
        let objectives = parse_objectives(&root);
        assert_eq!(objectives[0].id, None);

        let err = reconstruct(None, &objectives, "Knowledge check", "lesson", &defaults())
            .unwrap_err();
        assert!(err.to_string().contains("unknown objective"));
        Ok(())
    }

    #[test]
    fn unnamed_objective_takes_group_title() -> anyhow::Result<()> {
        let objectives = vec![Objective {
            id: Some("obj-3".to_owned()),
            name: String::new(),
            questions: Vec::new(),
        }];
        let exercise = reconstruct(Some("obj-3"), &objectives, "Knowledge check", "lesson", &defaults())?;
        assert_eq!(exercise.title, "Knowledge check");
        assert!(exercise.questions.is_empty());
        Ok(())
    }
}
