// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Static FHIR R4 type information used by JSON-backed elements
//!
//! Only a core set of types is described field by field. Resources and
//! data types outside that set are treated as open: any JSON key is a field.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Field of a structured type. Choice fields are written `value[x]` and
/// list the allowed type suffixes.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    pub name: &'static str,
    pub type_name: &'static str,
    pub choices: &'static [&'static str],
}

impl FieldInfo {
    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// A structured type with its base type and own fields
#[derive(Debug)]
pub struct TypeInfo {
    pub name: &'static str,
    pub base: Option<&'static str>,
    pub fields: Vec<FieldInfo>,
}

const fn f(name: &'static str, type_name: &'static str) -> FieldInfo {
    FieldInfo {
        name,
        type_name,
        choices: &[],
    }
}

const fn choice(name: &'static str, choices: &'static [&'static str]) -> FieldInfo {
    FieldInfo {
        name,
        type_name: "",
        choices,
    }
}

const VALUE_CHOICES: &[&str] = &[
    "Quantity",
    "CodeableConcept",
    "String",
    "Boolean",
    "Integer",
    "Range",
    "Ratio",
    "SampledData",
    "Time",
    "DateTime",
    "Period",
];

const EXTENSION_VALUE_CHOICES: &[&str] = &[
    "Base64Binary",
    "Boolean",
    "Canonical",
    "Code",
    "Date",
    "DateTime",
    "Decimal",
    "Id",
    "Instant",
    "Integer",
    "Markdown",
    "Oid",
    "PositiveInt",
    "String",
    "Time",
    "UnsignedInt",
    "Uri",
    "Url",
    "Uuid",
    "Address",
    "Age",
    "Annotation",
    "Attachment",
    "CodeableConcept",
    "Coding",
    "ContactPoint",
    "Count",
    "Distance",
    "Duration",
    "HumanName",
    "Identifier",
    "Money",
    "Period",
    "Quantity",
    "Range",
    "Ratio",
    "Reference",
    "SampledData",
    "Signature",
    "Timing",
];

const EFFECTIVE_CHOICES: &[&str] = &["DateTime", "Period", "Timing", "Instant"];

const QUANTITY_FIELDS: &[FieldInfo] = &[
    f("value", "decimal"),
    f("comparator", "code"),
    f("unit", "string"),
    f("system", "uri"),
    f("code", "code"),
];

fn type_table() -> Vec<TypeInfo> {
    let t = |name: &'static str, base: Option<&'static str>, fields: &[FieldInfo]| TypeInfo {
        name,
        base,
        fields: fields.to_vec(),
    };
    vec![
        t("Element", None, &[f("id", "string"), f("extension", "Extension")]),
        t(
            "BackboneElement",
            Some("Element"),
            &[f("modifierExtension", "Extension")],
        ),
        t(
            "Resource",
            None,
            &[
                f("id", "id"),
                f("meta", "Meta"),
                f("implicitRules", "uri"),
                f("language", "code"),
            ],
        ),
        t(
            "DomainResource",
            Some("Resource"),
            &[
                f("text", "Narrative"),
                f("contained", "Resource"),
                f("extension", "Extension"),
                f("modifierExtension", "Extension"),
            ],
        ),
        t(
            "Extension",
            Some("Element"),
            &[f("url", "uri"), choice("value[x]", EXTENSION_VALUE_CHOICES)],
        ),
        t(
            "Meta",
            Some("Element"),
            &[
                f("versionId", "id"),
                f("lastUpdated", "instant"),
                f("source", "uri"),
                f("profile", "canonical"),
                f("security", "Coding"),
                f("tag", "Coding"),
            ],
        ),
        t(
            "Narrative",
            Some("Element"),
            &[f("status", "code"), f("div", "xhtml")],
        ),
        t(
            "Coding",
            Some("Element"),
            &[
                f("system", "uri"),
                f("version", "string"),
                f("code", "code"),
                f("display", "string"),
                f("userSelected", "boolean"),
            ],
        ),
        t(
            "CodeableConcept",
            Some("Element"),
            &[f("coding", "Coding"), f("text", "string")],
        ),
        t("Quantity", Some("Element"), QUANTITY_FIELDS),
        t("SimpleQuantity", Some("Quantity"), &[]),
        t("Age", Some("Quantity"), &[]),
        t("Duration", Some("Quantity"), &[]),
        t("Distance", Some("Quantity"), &[]),
        t("Count", Some("Quantity"), &[]),
        t(
            "Period",
            Some("Element"),
            &[f("start", "dateTime"), f("end", "dateTime")],
        ),
        t(
            "Range",
            Some("Element"),
            &[f("low", "Quantity"), f("high", "Quantity")],
        ),
        t(
            "Ratio",
            Some("Element"),
            &[f("numerator", "Quantity"), f("denominator", "Quantity")],
        ),
        t(
            "Identifier",
            Some("Element"),
            &[
                f("use", "code"),
                f("type", "CodeableConcept"),
                f("system", "uri"),
                f("value", "string"),
                f("period", "Period"),
                f("assigner", "Reference"),
            ],
        ),
        t(
            "Reference",
            Some("Element"),
            &[
                f("reference", "string"),
                f("type", "uri"),
                f("identifier", "Identifier"),
                f("display", "string"),
            ],
        ),
        t(
            "HumanName",
            Some("Element"),
            &[
                f("use", "code"),
                f("text", "string"),
                f("family", "string"),
                f("given", "string"),
                f("prefix", "string"),
                f("suffix", "string"),
                f("period", "Period"),
            ],
        ),
        t(
            "ContactPoint",
            Some("Element"),
            &[
                f("system", "code"),
                f("value", "string"),
                f("use", "code"),
                f("rank", "positiveInt"),
                f("period", "Period"),
            ],
        ),
        t(
            "Address",
            Some("Element"),
            &[
                f("use", "code"),
                f("type", "code"),
                f("text", "string"),
                f("line", "string"),
                f("city", "string"),
                f("district", "string"),
                f("state", "string"),
                f("postalCode", "string"),
                f("country", "string"),
                f("period", "Period"),
            ],
        ),
        t(
            "Attachment",
            Some("Element"),
            &[
                f("contentType", "code"),
                f("language", "code"),
                f("data", "base64Binary"),
                f("url", "url"),
                f("size", "unsignedInt"),
                f("hash", "base64Binary"),
                f("title", "string"),
                f("creation", "dateTime"),
            ],
        ),
        t(
            "Annotation",
            Some("Element"),
            &[
                choice("author[x]", &["Reference", "String"]),
                f("time", "dateTime"),
                f("text", "markdown"),
            ],
        ),
        t(
            "Patient",
            Some("DomainResource"),
            &[
                f("identifier", "Identifier"),
                f("active", "boolean"),
                f("name", "HumanName"),
                f("telecom", "ContactPoint"),
                f("gender", "code"),
                f("birthDate", "date"),
                choice("deceased[x]", &["Boolean", "DateTime"]),
                f("address", "Address"),
                f("maritalStatus", "CodeableConcept"),
                choice("multipleBirth[x]", &["Boolean", "Integer"]),
                f("photo", "Attachment"),
                f("contact", "Patient.contact"),
                f("communication", "Patient.communication"),
                f("generalPractitioner", "Reference"),
                f("managingOrganization", "Reference"),
                f("link", "Patient.link"),
            ],
        ),
        t(
            "Patient.contact",
            Some("BackboneElement"),
            &[
                f("relationship", "CodeableConcept"),
                f("name", "HumanName"),
                f("telecom", "ContactPoint"),
                f("address", "Address"),
                f("gender", "code"),
                f("organization", "Reference"),
                f("period", "Period"),
            ],
        ),
        t(
            "Patient.communication",
            Some("BackboneElement"),
            &[f("language", "CodeableConcept"), f("preferred", "boolean")],
        ),
        t(
            "Patient.link",
            Some("BackboneElement"),
            &[f("other", "Reference"), f("type", "code")],
        ),
        t(
            "Observation",
            Some("DomainResource"),
            &[
                f("identifier", "Identifier"),
                f("basedOn", "Reference"),
                f("partOf", "Reference"),
                f("status", "code"),
                f("category", "CodeableConcept"),
                f("code", "CodeableConcept"),
                f("subject", "Reference"),
                f("focus", "Reference"),
                f("encounter", "Reference"),
                choice("effective[x]", EFFECTIVE_CHOICES),
                f("issued", "instant"),
                f("performer", "Reference"),
                choice("value[x]", VALUE_CHOICES),
                f("dataAbsentReason", "CodeableConcept"),
                f("interpretation", "CodeableConcept"),
                f("note", "Annotation"),
                f("bodySite", "CodeableConcept"),
                f("method", "CodeableConcept"),
                f("specimen", "Reference"),
                f("device", "Reference"),
                f("referenceRange", "Observation.referenceRange"),
                f("hasMember", "Reference"),
                f("derivedFrom", "Reference"),
                f("component", "Observation.component"),
            ],
        ),
        t(
            "Observation.referenceRange",
            Some("BackboneElement"),
            &[
                f("low", "Quantity"),
                f("high", "Quantity"),
                f("type", "CodeableConcept"),
                f("appliesTo", "CodeableConcept"),
                f("age", "Range"),
                f("text", "string"),
            ],
        ),
        t(
            "Observation.component",
            Some("BackboneElement"),
            &[
                f("code", "CodeableConcept"),
                choice("value[x]", VALUE_CHOICES),
                f("dataAbsentReason", "CodeableConcept"),
                f("interpretation", "CodeableConcept"),
                f("referenceRange", "Observation.referenceRange"),
            ],
        ),
        t(
            "Encounter",
            Some("DomainResource"),
            &[
                f("identifier", "Identifier"),
                f("status", "code"),
                f("class", "Coding"),
                f("type", "CodeableConcept"),
                f("serviceType", "CodeableConcept"),
                f("priority", "CodeableConcept"),
                f("subject", "Reference"),
                f("basedOn", "Reference"),
                f("period", "Period"),
                f("length", "Duration"),
                f("reasonCode", "CodeableConcept"),
                f("reasonReference", "Reference"),
                f("serviceProvider", "Reference"),
                f("partOf", "Reference"),
            ],
        ),
        t(
            "Condition",
            Some("DomainResource"),
            &[
                f("identifier", "Identifier"),
                f("clinicalStatus", "CodeableConcept"),
                f("verificationStatus", "CodeableConcept"),
                f("category", "CodeableConcept"),
                f("severity", "CodeableConcept"),
                f("code", "CodeableConcept"),
                f("bodySite", "CodeableConcept"),
                f("subject", "Reference"),
                f("encounter", "Reference"),
                choice("onset[x]", &["DateTime", "Age", "Period", "Range", "String"]),
                choice("abatement[x]", &["DateTime", "Age", "Period", "Range", "String"]),
                f("recordedDate", "dateTime"),
                f("recorder", "Reference"),
                f("asserter", "Reference"),
                f("note", "Annotation"),
            ],
        ),
        t(
            "Bundle",
            Some("Resource"),
            &[
                f("identifier", "Identifier"),
                f("type", "code"),
                f("timestamp", "instant"),
                f("total", "unsignedInt"),
                f("link", "Bundle.link"),
                f("entry", "Bundle.entry"),
                f("signature", "Signature"),
            ],
        ),
        t(
            "Bundle.link",
            Some("BackboneElement"),
            &[f("relation", "string"), f("url", "uri")],
        ),
        t(
            "Bundle.entry",
            Some("BackboneElement"),
            &[
                f("link", "Bundle.link"),
                f("fullUrl", "uri"),
                f("resource", "Resource"),
                f("search", "Bundle.entry.search"),
                f("request", "Bundle.entry.request"),
                f("response", "Bundle.entry.response"),
            ],
        ),
    ]
}

static TYPES: LazyLock<FxHashMap<&'static str, TypeInfo>> = LazyLock::new(|| {
    type_table()
        .into_iter()
        .map(|info| (info.name, info))
        .collect()
});

/// FHIR R4 resource type names
pub const RESOURCE_TYPES: &[&str] = &[
    "Account", "ActivityDefinition", "AdverseEvent", "AllergyIntolerance", "Appointment",
    "AppointmentResponse", "AuditEvent", "Basic", "Binary", "BiologicallyDerivedProduct",
    "BodyStructure", "Bundle", "CapabilityStatement", "CarePlan", "CareTeam", "CatalogEntry",
    "ChargeItem", "ChargeItemDefinition", "Claim", "ClaimResponse", "ClinicalImpression",
    "CodeSystem", "Communication", "CommunicationRequest", "CompartmentDefinition", "Composition",
    "ConceptMap", "Condition", "Consent", "Contract", "Coverage", "CoverageEligibilityRequest",
    "CoverageEligibilityResponse", "DetectedIssue", "Device", "DeviceDefinition", "DeviceMetric",
    "DeviceRequest", "DeviceUseStatement", "DiagnosticReport", "DocumentManifest",
    "DocumentReference", "EffectEvidenceSynthesis", "Encounter", "Endpoint", "EnrollmentRequest",
    "EnrollmentResponse", "EpisodeOfCare", "EventDefinition", "Evidence", "EvidenceVariable",
    "ExampleScenario", "ExplanationOfBenefit", "FamilyMemberHistory", "Flag", "Goal",
    "GraphDefinition", "Group", "GuidanceResponse", "HealthcareService", "ImagingStudy",
    "Immunization", "ImmunizationEvaluation", "ImmunizationRecommendation", "ImplementationGuide",
    "InsurancePlan", "Invoice", "Library", "Linkage", "List", "Location", "Measure",
    "MeasureReport", "Media", "Medication", "MedicationAdministration", "MedicationDispense",
    "MedicationKnowledge", "MedicationRequest", "MedicationStatement", "MedicinalProduct",
    "MedicinalProductAuthorization", "MedicinalProductContraindication",
    "MedicinalProductIndication", "MedicinalProductIngredient", "MedicinalProductInteraction",
    "MedicinalProductManufactured", "MedicinalProductPackaged", "MedicinalProductPharmaceutical",
    "MedicinalProductUndesirableEffect", "MessageDefinition", "MessageHeader",
    "MolecularSequence", "NamingSystem", "NutritionOrder", "Observation",
    "ObservationDefinition", "OperationDefinition", "OperationOutcome", "Organization",
    "OrganizationAffiliation", "Parameters", "Patient", "PaymentNotice", "PaymentReconciliation",
    "Person", "PlanDefinition", "Practitioner", "PractitionerRole", "Procedure", "Provenance",
    "Questionnaire", "QuestionnaireResponse", "RelatedPerson", "RequestGroup",
    "ResearchDefinition", "ResearchElementDefinition", "ResearchStudy", "ResearchSubject",
    "RiskAssessment", "RiskEvidenceSynthesis", "Schedule", "SearchParameter", "ServiceRequest",
    "Slot", "Specimen", "SpecimenDefinition", "StructureDefinition", "StructureMap",
    "Subscription", "Substance", "SubstanceNucleicAcid", "SubstancePolymer", "SubstanceProtein",
    "SubstanceReferenceInformation", "SubstanceSourceMaterial", "SubstanceSpecification",
    "SupplyDelivery", "SupplyRequest", "Task", "TerminologyCapabilities", "TestReport",
    "TestScript", "ValueSet", "VerificationResult", "VisionPrescription",
];

/// True for FHIR resource type names (including the abstract bases)
pub fn is_resource_type(name: &str) -> bool {
    name == "Resource" || name == "DomainResource" || RESOURCE_TYPES.contains(&name)
}

/// True for FHIR primitive type names
pub fn is_primitive_type(name: &str) -> bool {
    matches!(
        name,
        "boolean"
            | "integer"
            | "positiveInt"
            | "unsignedInt"
            | "integer64"
            | "decimal"
            | "string"
            | "code"
            | "id"
            | "uri"
            | "url"
            | "canonical"
            | "oid"
            | "uuid"
            | "markdown"
            | "base64Binary"
            | "xhtml"
            | "date"
            | "dateTime"
            | "instant"
            | "time"
    )
}

/// Described type, if any
pub fn type_info(name: &str) -> Option<&'static TypeInfo> {
    TYPES.get(name)
}

/// Base type of `name`. Undescribed resources derive from `DomainResource`
/// except the few that derive from `Resource` directly.
pub fn base_type(name: &str) -> Option<&'static str> {
    if let Some(info) = type_info(name) {
        return info.base;
    }
    match name {
        "Bundle" | "Binary" | "Parameters" => Some("Resource"),
        other if is_resource_type(other) => Some("DomainResource"),
        _ => Some("Element"),
    }
}

/// True when `name` is `target` or derives from it
pub fn is_subtype_of(name: &str, target: &str) -> bool {
    let mut current = Some(name);
    let mut depth = 0;
    while let Some(type_name) = current {
        if type_name == target {
            return true;
        }
        if type_name == "Element" || type_name == "Resource" || depth > 8 {
            return false;
        }
        current = base_type(type_name);
        depth += 1;
    }
    false
}

/// Field lookup through the base-type chain
pub fn find_field(type_name: &str, field: &str) -> Option<FieldInfo> {
    let mut current = Some(type_name);
    while let Some(name) = current {
        let info = type_info(name)?;
        if let Some(found) = info.fields.iter().find(|f| f.base_name() == field) {
            return Some(*found);
        }
        current = info.base;
    }
    None
}

/// Every field name of a described type, own fields first
pub fn field_names(type_name: &str) -> Vec<&'static str> {
    let mut names = Vec::new();
    let mut current = Some(type_name);
    while let Some(name) = current {
        let Some(info) = type_info(name) else { break };
        names.extend(info.fields.iter().map(FieldInfo::base_name));
        current = info.base;
    }
    names
}

impl FieldInfo {
    /// Name without the `[x]` marker
    pub fn base_name(&self) -> &'static str {
        self.name.strip_suffix("[x]").unwrap_or(self.name)
    }
}

/// Schema type of a choice suffix: `Quantity` stays, `DateTime` becomes `dateTime`
pub fn choice_suffix_type(suffix: &str) -> String {
    let mut chars = suffix.chars();
    let lowered = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if is_primitive_type(&lowered) {
        lowered
    } else {
        suffix.to_string()
    }
}
