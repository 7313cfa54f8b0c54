//! Workflow journal
//!
//! Epistemic facts recorded alongside progress: assumptions made,
//! questions still open, decisions taken, risks carried. Ids are
//! sequential within each kind ("A1", "Q1", "D1", "R1").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumptions: Vec<Assumption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_questions: Vec<OpenQuestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<Decision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<Risk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub id: String,
    pub text: String,
    /// open | validated | invalidated
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// open | resolved | deferred
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub answer: String,
    /// File or section reference
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub text: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// proposed | accepted | reversed
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub text: String,
    /// low | medium | high
    pub severity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mitigation: String,
    /// open | mitigated | accepted
    pub status: String,
}

impl Journal {
    /// Record an assumption; returns its id
    pub fn add_assumption(&mut self, text: &str, owner: &str) -> String {
        let id = format!("A{}", self.assumptions.len() + 1);
        self.assumptions.push(Assumption {
            id: id.clone(),
            text: text.to_string(),
            status: "open".to_string(),
            owner: owner.to_string(),
            created_at: Utc::now(),
        });
        id
    }

    /// Record an open question; returns its id
    pub fn add_open_question(&mut self, text: &str, tags: Vec<String>, context: &str) -> String {
        let id = format!("Q{}", self.open_questions.len() + 1);
        self.open_questions.push(OpenQuestion {
            id: id.clone(),
            text: text.to_string(),
            tags,
            status: "open".to_string(),
            answer: String::new(),
            context: context.to_string(),
        });
        id
    }

    /// Record a decision; returns its id
    pub fn add_decision(&mut self, text: &str, rationale: &str, alternatives: Vec<String>) -> String {
        let id = format!("D{}", self.decisions.len() + 1);
        self.decisions.push(Decision {
            id: id.clone(),
            text: text.to_string(),
            rationale: rationale.to_string(),
            alternatives,
            status: "proposed".to_string(),
            created_at: Utc::now(),
        });
        id
    }

    /// Record a risk; returns its id
    pub fn add_risk(&mut self, text: &str, severity: &str) -> String {
        let id = format!("R{}", self.risks.len() + 1);
        self.risks.push(Risk {
            id: id.clone(),
            text: text.to_string(),
            severity: severity.to_string(),
            mitigation: String::new(),
            status: "open".to_string(),
        });
        id
    }

    /// Set an assumption's status; false when the id is unknown
    pub fn close_assumption(&mut self, id: &str, status: &str) -> bool {
        match self.assumptions.iter_mut().find(|a| a.id == id) {
            Some(assumption) => {
                assumption.status = status.to_string();
                true
            }
            None => false,
        }
    }

    /// Resolve an open question with an answer; false when the id is unknown
    pub fn resolve_open_question(&mut self, id: &str, answer: &str) -> bool {
        match self.open_questions.iter_mut().find(|q| q.id == id) {
            Some(question) => {
                question.status = "resolved".to_string();
                question.answer = answer.to_string();
                true
            }
            None => false,
        }
    }

    /// Set a decision's status; false when the id is unknown
    pub fn update_decision(&mut self, id: &str, status: &str) -> bool {
        match self.decisions.iter_mut().find(|d| d.id == id) {
            Some(decision) => {
                decision.status = status.to_string();
                true
            }
            None => false,
        }
    }

    /// Attach a mitigation to a risk; false when the id is unknown
    pub fn mitigate_risk(&mut self, id: &str, mitigation: &str, status: &str) -> bool {
        match self.risks.iter_mut().find(|r| r.id == id) {
            Some(risk) => {
                risk.mitigation = mitigation.to_string();
                risk.status = status.to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_kind() {
        let mut journal = Journal::default();
        assert_eq!(journal.add_assumption("single writer", "ana"), "A1");
        assert_eq!(journal.add_assumption("posix rename", "ana"), "A2");
        assert_eq!(journal.add_open_question("diamond policy?", vec![], ""), "Q1");
        assert_eq!(journal.add_risk("restore race", "medium"), "R1");
    }

    #[test]
    fn resolving_unknown_id_is_false() {
        let mut journal = Journal::default();
        assert!(!journal.resolve_open_question("Q9", "n/a"));
        journal.add_open_question("policy?", vec![], "");
        assert!(journal.resolve_open_question("Q1", "last write wins"));
        assert_eq!(journal.open_questions[0].status, "resolved");
    }

    #[test]
    fn decision_lifecycle() {
        let mut journal = Journal::default();
        let id = journal.add_decision("use rename swaps", "atomic per component", vec![]);
        assert!(journal.update_decision(&id, "accepted"));
        assert_eq!(journal.decisions[0].status, "accepted");
    }
}
