//! Merge of overlapping registry results.

use std::collections::HashMap;

use ttb_core::CompanyRecord;

/// One record per `registry_id`, in first-seen order.
///
/// The first occurrence wins every field it already has; later duplicates
/// only fill what it lacks.
#[must_use]
pub fn dedupe(records: Vec<CompanyRecord>) -> Vec<CompanyRecord> {
    let input_len = records.len();
    let mut position: HashMap<String, usize> = HashMap::with_capacity(input_len);
    let mut unique: Vec<CompanyRecord> = Vec::with_capacity(records.len());

    for record in records {
        match position.get(&record.registry_id) {
            Some(&idx) => unique[idx].absorb(&record),
            None => {
                position.insert(record.registry_id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    if unique.len() < input_len {
        tracing::debug!(
            input = input_len,
            unique = unique.len(),
            "merged duplicate registry records"
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ttb_core::{Contact, RecordSource};

    fn rec(id: &str, name: &str, source: RecordSource) -> CompanyRecord {
        let mut r = CompanyRecord::keyed(Some(id), None, source).expect("keyed");
        r.name = Some(name.to_string());
        r
    }

    #[test]
    fn first_seen_wins_on_conflicts() {
        let first = rec("123456789", "ACME", RecordSource::RechercheEntreprises);
        let mut second = rec("123456789", "ACME SAS", RecordSource::Pappers);
        second.contact = Some(Contact {
            email: Some("a@acme.fr".into()),
            ..Contact::default()
        });
        second.legal_form = Some("SAS".into());

        let out = dedupe(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name.as_deref(), Some("ACME"));
        assert_eq!(out[0].source, RecordSource::RechercheEntreprises);
        assert_eq!(out[0].email(), Some("a@acme.fr"));
        assert_eq!(out[0].legal_form.as_deref(), Some("SAS"));
    }

    #[test]
    fn keeps_first_seen_order() {
        let out = dedupe(vec![
            rec("3", "C", RecordSource::Sirene),
            rec("1", "A", RecordSource::Sirene),
            rec("3", "C2", RecordSource::Sirene),
            rec("2", "B", RecordSource::Sirene),
        ]);
        let ids: Vec<&str> = out.iter().map(|r| r.registry_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn is_idempotent_and_yields_unique_ids() {
        let input = vec![
            rec("1", "A", RecordSource::Sirene),
            rec("2", "B", RecordSource::Pappers),
            rec("1", "A bis", RecordSource::Pappers),
            rec("2", "B bis", RecordSource::Sirene),
            rec("3", "C", RecordSource::RechercheEntreprises),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);

        let ids: HashSet<&str> = once.iter().map(|r| r.registry_id.as_str()).collect();
        assert_eq!(ids.len(), once.len());
    }
}
