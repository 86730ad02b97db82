#![allow(dead_code)]

use rusqlite::Connection;
use sgc_core::db::{open_db, open_db_in_memory};
use sgc_core::model::mapa::MapaId;
use sgc_core::model::registro::Movimentacao;
use sgc_core::model::unidade::Responsavel;
use sgc_core::repo::mapa_repo::{MapaRepository, SqliteMapaRepository};
use sgc_core::repo::unidade_repo::{SqliteUnidadeRepository, UnidadeRepository};
use sgc_core::{
    CodigoUnidade, CriarProcessoRequest, Email, MapaService, Mailer, NotifyError, Perfil,
    Processo, ProcessoService, SgcConfig, Subprocesso, SubprocessoId, TipoProcesso, TipoUnidade,
    Unidade, UsuarioAtivo, WorkflowEngine,
};
use std::cell::{Cell, RefCell};
use std::path::Path;

pub const SEDOC: CodigoUnidade = 1;
pub const COORD: CodigoUnidade = 2;
pub const SESEL: CodigoUnidade = 3;
pub const SENIC: CodigoUnidade = 4;
pub const SECRE: CodigoUnidade = 5;
pub const SEJUD: CodigoUnidade = 6;

/// 2030-01-01T00:00:00Z
pub const PRAZO: i64 = 1_893_456_000_000;
/// 2030-02-15T00:00:00Z
pub const PRAZO_MAPA: i64 = 1_897_344_000_000;

/// Mail transport that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub enviados: RefCell<Vec<Email>>,
}

impl RecordingMailer {
    pub fn destinatarios(&self) -> Vec<String> {
        self.enviados
            .borrow()
            .iter()
            .map(|email| email.destinatario.clone())
            .collect()
    }

    pub fn limpar(&self) {
        self.enviados.borrow_mut().clear();
    }
}

impl Mailer for RecordingMailer {
    fn enviar(&self, email: &Email) -> Result<(), NotifyError> {
        self.enviados.borrow_mut().push(email.clone());
        Ok(())
    }
}

/// Mail transport that is always down; counts the attempts.
#[derive(Default)]
pub struct FailingMailer {
    pub tentativas: Cell<usize>,
}

impl Mailer for FailingMailer {
    fn enviar(&self, _email: &Email) -> Result<(), NotifyError> {
        self.tentativas.set(self.tentativas.get() + 1);
        Err(NotifyError::Transport("smtp indisponivel".to_string()))
    }
}

/// Database seeded with this tree:
///
/// ```text
/// SEDOC (1, raiz)
/// ├── COORD (2, interoperacional)
/// │   ├── SESEL (3)
/// │   └── SENIC (4)
/// └── SECRE (5, intermediaria)
///     └── SEJUD (6)
/// ```
pub struct Cenario {
    pub conn: Connection,
    pub mailer: RecordingMailer,
    pub config: SgcConfig,
}

impl Cenario {
    pub fn novo() -> Self {
        Self::sobre(open_db_in_memory().unwrap())
    }

    /// Same tree in a database file other connections can open.
    pub fn em_arquivo(path: &Path) -> Self {
        Self::sobre(open_db(path).unwrap())
    }

    fn sobre(conn: Connection) -> Self {
        {
            let unidades = SqliteUnidadeRepository::try_new(&conn).unwrap();
            for unidade in [
                Unidade::new(SEDOC, "SEDOC", "Secretaria de Documentacao", TipoUnidade::Raiz, None),
                Unidade::new(COORD, "COORD", "Coordenadoria", TipoUnidade::Interoperacional, Some(SEDOC)),
                Unidade::new(SESEL, "SESEL", "Secao de Selecao", TipoUnidade::Operacional, Some(COORD)),
                Unidade::new(SENIC, "SENIC", "Secao de Iniciativas", TipoUnidade::Operacional, Some(COORD)),
                Unidade::new(SECRE, "SECRE", "Secretaria", TipoUnidade::Intermediaria, Some(SEDOC)),
                Unidade::new(SEJUD, "SEJUD", "Secao Judiciaria", TipoUnidade::Operacional, Some(SECRE)),
            ] {
                unidades.inserir_unidade(&unidade).unwrap();
            }
            unidades
                .inserir_responsavel(&Responsavel {
                    unidade: SESEL,
                    titulo: "300".to_string(),
                    nome: "Chefe SESEL".to_string(),
                    email: Some("chefe.sesel@tre-pe.jus.br".to_string()),
                })
                .unwrap();
        }
        Self {
            conn,
            mailer: RecordingMailer::default(),
            config: SgcConfig::default(),
        }
    }

    pub fn engine(&self) -> WorkflowEngine<'_, &RecordingMailer> {
        WorkflowEngine::try_new(&self.conn, &self.mailer, &self.config).unwrap()
    }

    pub fn processos(&self) -> ProcessoService<'_, &RecordingMailer> {
        ProcessoService::try_new(&self.conn, &self.mailer, &self.config).unwrap()
    }

    pub fn mapas(&self) -> MapaService<'_> {
        MapaService::try_new(&self.conn).unwrap()
    }

    pub fn criar_processo(&self, tipo: TipoProcesso, unidades: &[CodigoUnidade]) -> Processo {
        self.processos()
            .criar(
                CriarProcessoRequest {
                    descricao: format!("Processo {}", tipo.as_str()),
                    tipo,
                    data_limite: PRAZO,
                    unidades: unidades.to_vec(),
                },
                &admin(),
            )
            .unwrap()
    }

    /// Creates and starts a process; returns it with the mailer emptied.
    pub fn iniciar(&self, tipo: TipoProcesso, unidades: &[CodigoUnidade]) -> Processo {
        let processo = self.criar_processo(tipo, unidades);
        let processo = self.processos().iniciar(processo.id, &admin()).unwrap();
        self.mailer.limpar();
        processo
    }

    pub fn subprocesso(&self, processo: &Processo, unidade: CodigoUnidade) -> Subprocesso {
        self.processos()
            .listar_subprocessos(processo.id, &admin())
            .unwrap()
            .into_iter()
            .find(|subprocesso| subprocesso.unidade == unidade)
            .unwrap()
    }

    pub fn atual(&self, id: SubprocessoId) -> Subprocesso {
        self.engine().obter_subprocesso(id, &admin()).unwrap()
    }

    pub fn movimentacoes(&self, id: SubprocessoId) -> Vec<Movimentacao> {
        self.engine().listar_movimentacoes(id, &admin()).unwrap()
    }

    /// One activity with one knowledge item, written by the unit's chefe.
    pub fn preencher_cadastro(&self, sub: &Subprocesso, atividade: &str) {
        let chefe = chefe(sub.unidade);
        let criada = self.mapas().criar_atividade(sub.id, atividade, &chefe).unwrap();
        self.mapas()
            .adicionar_conhecimento(sub.id, criada.id, &format!("Conhecimento de {atividade}"), &chefe)
            .unwrap();
    }

    /// Drives a MAPEAMENTO subprocess of SESEL/SENIC to CADASTRO_HOMOLOGADO.
    pub fn homologar_cadastro(&self, sub: &Subprocesso) {
        self.preencher_cadastro(sub, "Analisar editais");
        self.engine().disponibilizar_cadastro(sub.id, &chefe(sub.unidade)).unwrap();
        self.engine().aceitar_cadastro(sub.id, None, &gestor()).unwrap();
        self.engine().homologar_cadastro(sub.id, None, &admin()).unwrap();
    }

    /// Links every activity to one competency and sends the map for validation.
    pub fn disponibilizar_mapa(&self, sub: &Subprocesso) {
        let conteudo = self.mapas().obter_conteudo(sub.id, &admin()).unwrap();
        let atividades: Vec<_> = conteudo.atividades.iter().map(|atividade| atividade.id).collect();
        if conteudo.competencias.is_empty() {
            self.mapas()
                .criar_competencia(sub.id, "Gestao de editais", &atividades, &admin())
                .unwrap();
        }
        self.engine()
            .disponibilizar_mapa(sub.id, Some(PRAZO_MAPA), &admin())
            .unwrap();
    }

    /// Full MAPEAMENTO path up to MAPA_HOMOLOGADO.
    pub fn homologar_mapa(&self, sub: &Subprocesso) {
        self.homologar_cadastro(sub);
        self.disponibilizar_mapa(sub);
        self.engine().validar_mapa(sub.id, &chefe(sub.unidade)).unwrap();
        self.engine().aceitar_validacao(sub.id, None, &gestor()).unwrap();
        self.engine().homologar_validacao(sub.id, None, &admin()).unwrap();
    }

    /// Stores a homologated map as the unit's vigente map.
    pub fn semear_mapa_vigente(
        &self,
        unidade: CodigoUnidade,
        atividades: &[(&str, &str)],
        competencia: &str,
    ) -> MapaId {
        let mapas = SqliteMapaRepository::try_new(&self.conn).unwrap();
        let mapa = mapas.criar_mapa().unwrap();
        let mut ids = Vec::new();
        for (atividade, conhecimento) in atividades {
            let criada = mapas.inserir_atividade(mapa.id, atividade).unwrap();
            mapas.inserir_conhecimento(criada.id, conhecimento).unwrap();
            ids.push(criada.id);
        }
        mapas.inserir_competencia(mapa.id, competencia, &ids).unwrap();
        SqliteUnidadeRepository::try_new(&self.conn)
            .unwrap()
            .definir_mapa_vigente(unidade, mapa.id, PRAZO - 1)
            .unwrap();
        mapa.id
    }
}

pub fn admin() -> UsuarioAtivo {
    UsuarioAtivo::new("100", Perfil::Admin, SEDOC)
}

pub fn gestor() -> UsuarioAtivo {
    UsuarioAtivo::new("200", Perfil::Gestor, COORD)
}

pub fn chefe(unidade: CodigoUnidade) -> UsuarioAtivo {
    UsuarioAtivo::new(format!("3{unidade:02}"), Perfil::Chefe, unidade)
}

pub fn servidor(unidade: CodigoUnidade) -> UsuarioAtivo {
    UsuarioAtivo::new(format!("4{unidade:02}"), Perfil::Servidor, unidade)
}
