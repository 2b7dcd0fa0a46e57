use super::batch::ColumnBatch;
use super::table::Table;
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbCredential {
    pub id: i64,
    pub username: String,
    pub password: String,
}

impl DbCredential {
    /// Rows of a fetched `credentials.login_app` table; NULL cells skip the row.
    pub fn from_table(table: &Table) -> Vec<DbCredential> {
        table
            .records()
            .filter_map(|rec| {
                Some(DbCredential {
                    id: rec.get("id")?.as_i64()?,
                    username: rec.get("username")?.as_str()?.to_string(),
                    password: rec.get("password")?.as_str()?.to_string(),
                })
            })
            .collect()
    }
}

/// Taxonomic ranks above species; any may be unknown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Taxonomy {
    pub domain: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
}

/// A logged animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Animal {
    pub id: i64,
    pub animal_class: String,
    pub name: String,
    pub age: f64,
    pub sex: Option<String>,
    pub species: String,
    pub subspecies: String,
    #[serde(default)]
    pub taxonomy: Taxonomy,
}

impl Animal {
    pub fn new(
        id: i64,
        animal_class: impl Into<String>,
        name: impl Into<String>,
        age: f64,
        species: impl Into<String>,
        subspecies: impl Into<String>,
    ) -> Self {
        Self {
            id,
            animal_class: animal_class.into(),
            name: name.into(),
            age,
            sex: None,
            species: species.into(),
            subspecies: subspecies.into(),
            taxonomy: Taxonomy::default(),
        }
    }

    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    /// Column-oriented form of `animals`, ready for `insert_dict_in_db`.
    pub fn to_batch(animals: &[Animal]) -> ColumnBatch {
        let mut batch = ColumnBatch::new();
        batch.insert("id", column(animals, |a| a.id.into()));
        batch.insert("animal_class", column(animals, |a| a.animal_class.clone().into()));
        batch.insert("name", column(animals, |a| a.name.clone().into()));
        batch.insert("age", column(animals, |a| a.age.into()));
        batch.insert("sex", column(animals, |a| a.sex.clone().into()));
        batch.insert("species", column(animals, |a| a.species.clone().into()));
        batch.insert("subspecies", column(animals, |a| a.subspecies.clone().into()));
        batch.insert("domain", column(animals, |a| a.taxonomy.domain.clone().into()));
        batch.insert("kingdom", column(animals, |a| a.taxonomy.kingdom.clone().into()));
        batch.insert("phylum", column(animals, |a| a.taxonomy.phylum.clone().into()));
        batch.insert("class", column(animals, |a| a.taxonomy.class.clone().into()));
        batch.insert("order", column(animals, |a| a.taxonomy.order.clone().into()));
        batch.insert("family", column(animals, |a| a.taxonomy.family.clone().into()));
        batch.insert("genus", column(animals, |a| a.taxonomy.genus.clone().into()));
        batch
    }

    /// Rebuild animals from a fetched `animals.animal` table; rows missing a
    /// required field are skipped.
    pub fn from_table(table: &Table) -> Vec<Animal> {
        table
            .records()
            .filter_map(|rec| {
                let text = |name: &str| rec.get(name).and_then(Value::as_str).map(str::to_string);
                Some(Animal {
                    id: rec.get("id")?.as_i64()?,
                    animal_class: text("animal_class")?,
                    name: text("name")?,
                    age: rec.get("age")?.as_f64()?,
                    sex: text("sex"),
                    species: text("species")?,
                    subspecies: text("subspecies")?,
                    taxonomy: Taxonomy {
                        domain: text("domain"),
                        kingdom: text("kingdom"),
                        phylum: text("phylum"),
                        class: text("class"),
                        order: text("order"),
                        family: text("family"),
                        genus: text("genus"),
                    },
                })
            })
            .collect()
    }
}

fn column<F: Fn(&Animal) -> Value>(animals: &[Animal], f: F) -> Vec<Value> {
    animals.iter().map(f).collect()
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.name.chars();
        let name: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        write!(
            f,
            "{} ({:?}) - {} {} ({})",
            name,
            self.age,
            self.sex.as_deref().unwrap_or("None"),
            self.species,
            self.subspecies
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leo() -> Animal {
        Animal::new(1, "mammals", "leo", 4.5, "Panthera leo", "P. l. leo").with_sex("male")
    }

    #[test]
    fn display_capitalizes_name() {
        assert_eq!(
            leo().to_string(),
            "Leo (4.5) - male Panthera leo (P. l. leo)"
        );
        let unknown = Animal::new(2, "birds", "KIWI", 2.0, "Apteryx", "mantelli");
        assert_eq!(unknown.to_string(), "Kiwi (2.0) - None Apteryx (mantelli)");
        let calf = Animal::new(3, "mammals", "dumbo", 0.25, "Loxodonta", "africana");
        assert_eq!(calf.to_string(), "Dumbo (0.25) - None Loxodonta (africana)");
    }

    #[test]
    fn batch_has_one_entry_per_animal() {
        let tax = Taxonomy {
            genus: Some("Panthera".to_string()),
            ..Taxonomy::default()
        };
        let animals = vec![leo().with_taxonomy(tax), leo()];
        let batch = Animal::to_batch(&animals);

        assert_eq!(batch.uniform_len(), Some(2));
        assert_eq!(batch.get("genus").unwrap()[0], Value::from("Panthera"));
        assert_eq!(batch.get("genus").unwrap()[1], Value::Null);
        assert!(batch.get("weight").is_none());
    }
}
